//! Matching an utterance against a catalog of named entries (services or
//! staff). Containment is checked on normalized text; the first matching
//! entry wins and catalog order is the tie-break.

/// Find the first catalog entry whose name appears inside the utterance.
pub fn match_by_name<'a, T>(
    text: &str,
    items: &'a [T],
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let utterance = normalize(text);
    if utterance.is_empty() {
        return None;
    }

    items.iter().find(|item| {
        let name = normalize(name_of(item));
        !name.is_empty() && utterance.contains(&name)
    })
}

fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.trim().chars() {
        if ch == '.' {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
                last_was_space = true;
            }
            continue;
        }
        for lowered in ch.to_lowercase() {
            normalized.push(lowered);
        }
        last_was_space = false;
    }
    normalized.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::match_by_name;

    #[test]
    fn containment_is_case_and_punctuation_insensitive() {
        let services = vec!["Haircut".to_string(), "Beard Trim".to_string()];
        let matched = match_by_name("I'd like a haircut tomorrow", &services, |s| s);
        assert_eq!(matched.map(String::as_str), Some("Haircut"));

        let staff = vec!["Dr. Jane Doe".to_string()];
        let matched = match_by_name("with dr jane doe please", &staff, |s| s);
        assert!(matched.is_some());
    }

    #[test]
    fn first_catalog_entry_wins_ties() {
        let services = vec!["Color".to_string(), "Color and Cut".to_string()];
        let matched = match_by_name("color and cut please", &services, |s| s);
        assert_eq!(matched.map(String::as_str), Some("Color"));
    }

    #[test]
    fn blank_names_never_match() {
        let services = vec!["  ".to_string()];
        assert!(match_by_name("anything", &services, |s| s).is_none());
    }
}
