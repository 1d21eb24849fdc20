//! Customer detail extraction: phone numbers, names, approval, and the
//! "no preference" signal used during staff selection.

use crate::extract::words;

const APPROVAL_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "ok", "okay", "sure", "confirm", "confirmed", "approve", "approved",
    "agree", "agreed", "accept", "alright",
];

const NO_PREFERENCE_PHRASES: &[&str] = &[
    "doesnt matter",
    "dont mind",
    "dont care",
    "no preference",
    "anyone",
    "anybody",
    "whoever",
    "you choose",
    "you pick",
    "up to you",
];

// Tokens that show up around names in speech but are never part of one.
const PHONE_WORDS: &[&str] = &["phone", "number", "tel", "mobile", "cell"];
const FILLER_WORDS: &[&str] = &[
    "my", "is", "its", "im", "this", "that", "the", "and", "here", "name", "surname", "at", "on",
    "in", "to", "me", "we", "us", "an", "of", "or", "so", "for", "from", "please", "want", "would",
    "like", "hello", "hi",
];
const NAME_STOPLIST: &[&str] = &["iphone", "android", "speaking", "myself", "calling"];

// Booking vocabulary and temporal words; without these a first-turn
// utterance like "appointment Friday at five" would be harvested as a
// two-token "name".
const TEMPORAL_WORDS: &[&str] = &[
    "appointment",
    "appointments",
    "book",
    "booking",
    "reserve",
    "reservation",
    "schedule",
    "available",
    "availability",
    "today",
    "tomorrow",
    "morning",
    "evening",
    "afternoon",
    "oclock",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "mon",
    "tue",
    "tues",
    "wed",
    "thu",
    "thur",
    "thurs",
    "fri",
    "sat",
    "sun",
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
];

/// Affirmative signal, matched on whole tokens so that "ok" never fires
/// inside "booking".
pub fn has_approval(text: &str) -> bool {
    words(&text.to_lowercase())
        .iter()
        .any(|token| APPROVAL_WORDS.contains(&strip_apostrophes(token).as_str()))
}

/// "Anyone is fine" during staff selection.
pub fn says_no_preference(text: &str) -> bool {
    let mut normalized = String::with_capacity(text.len());
    for token in words(&text.to_lowercase()) {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(&strip_apostrophes(&token));
    }
    NO_PREFERENCE_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}

/// First 10-11 digit run (with an optional extra leading zero) once all
/// whitespace is stripped; speech transcription splits numbers freely.
pub fn extract_phone(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = compact.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }
        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        let run = &compact[start..index];
        match run.len() {
            10 | 11 => return Some(run.to_string()),
            12 if run.starts_with('0') => return Some(run.to_string()),
            _ => {}
        }
    }
    None
}

/// Customer name extraction.
///
/// Strategy (a): a labeled form ("name: Jane Doe", "my name is Jane Doe").
/// Strategy (b): unlabeled free text, with approval words, phone words,
/// digits, and stray punctuation removed. Either way at least two tokens
/// must survive; the result is capped at four tokens / 80 characters.
pub fn extract_name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(labeled) = labeled_name(trimmed) {
        return Some(labeled);
    }
    unlabeled_name(trimmed)
}

fn labeled_name(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let label_at = find_token(&lowered, "name")?;
    let remainder = text.get(label_at + "name".len()..)?;
    let remainder = remainder.trim_start_matches([' ', ':', '-']);

    let parts = clean_name_tokens(remainder);
    (parts.len() >= 2).then(|| join_name(parts))
}

fn unlabeled_name(text: &str) -> Option<String> {
    let parts = clean_name_tokens(text);
    (parts.len() >= 2).then(|| join_name(parts))
}

fn clean_name_tokens(text: &str) -> Vec<String> {
    let mut kept = Vec::new();
    for raw in text.split_whitespace() {
        let token: String = raw
            .chars()
            .filter(|ch| ch.is_alphabetic() || *ch == '\'' || *ch == '-')
            .collect();
        if token.chars().filter(|ch| ch.is_alphabetic()).count() < 2 {
            continue;
        }

        let lowered = strip_apostrophes(&token.to_lowercase());
        if APPROVAL_WORDS.contains(&lowered.as_str())
            || PHONE_WORDS.contains(&lowered.as_str())
            || FILLER_WORDS.contains(&lowered.as_str())
            || NAME_STOPLIST.contains(&lowered.as_str())
            || TEMPORAL_WORDS.contains(&lowered.as_str())
        {
            continue;
        }
        kept.push(token);
    }
    kept
}

fn join_name(parts: Vec<String>) -> String {
    let mut name = parts.into_iter().take(4).collect::<Vec<_>>().join(" ");
    name.truncate(80);
    name.trim_end().to_string()
}

/// Byte offset of `needle` appearing as a whole token in `haystack`.
fn find_token(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(found) = haystack[from..].find(needle) {
        let start = from + found;
        let end = start + needle.len();
        let clear_left = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let clear_right =
            end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if clear_left && clear_right {
            return Some(start);
        }
        from = start + 1;
    }
    None
}

fn strip_apostrophes(token: &str) -> String {
    token.chars().filter(|ch| *ch != '\'').collect()
}
