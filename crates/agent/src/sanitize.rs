//! Cleanup of generated replies. Completion models occasionally echo the
//! same sentence or line twice, which sounds broken when spoken aloud.

/// Remove leading role prefixes, repeated first sentences, consecutive
/// duplicate lines, and immediately repeated words.
pub fn dedupe_repeats(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    if cleaned.is_empty() {
        return cleaned;
    }

    if let Some(rest) = cleaned.strip_prefix("Assistant:") {
        cleaned = rest.trim().to_string();
    }

    cleaned = trim_repeated_first_sentence(&cleaned);

    let mut lines: Vec<String> = Vec::new();
    for line in cleaned.lines() {
        let line = collapse_repeated_words(line.trim());
        if line.is_empty() {
            continue;
        }
        if lines.last().map(String::as_str) != Some(line.as_str()) {
            lines.push(line);
        }
    }

    lines.join("\n").trim().to_string()
}

fn trim_repeated_first_sentence(text: &str) -> String {
    let Some(boundary) = text.find(['.', '!', '?']) else {
        return text.to_string();
    };
    let first_sentence = &text[..=boundary];
    let rest = text[boundary + 1..].trim_start();

    if let Some(trimmed) = rest.strip_prefix(first_sentence) {
        return format!("{first_sentence} {}", trimmed.trim_start()).trim_end().to_string();
    }
    text.to_string()
}

fn collapse_repeated_words(line: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for word in line.split_whitespace() {
        if kept.last().map_or(false, |previous| previous.eq_ignore_ascii_case(word)) {
            continue;
        }
        kept.push(word);
    }
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::dedupe_repeats;

    #[test]
    fn repeated_first_sentence_is_trimmed() {
        assert_eq!(
            dedupe_repeats("Hello there! Hello there! How can I help?"),
            "Hello there! How can I help?"
        );
    }

    #[test]
    fn duplicate_lines_collapse() {
        assert_eq!(
            dedupe_repeats("See you Friday.\nSee you Friday.\nGoodbye."),
            "See you Friday.\nGoodbye."
        );
    }

    #[test]
    fn stuttered_words_collapse() {
        assert_eq!(dedupe_repeats("the the price is 200"), "the price is 200");
    }

    #[test]
    fn role_prefix_is_stripped() {
        assert_eq!(dedupe_repeats("Assistant: Happy to help."), "Happy to help.");
    }

    #[test]
    fn clean_text_passes_through() {
        assert_eq!(dedupe_repeats("Which time works for you?"), "Which time works for you?");
    }
}
