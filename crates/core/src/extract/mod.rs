//! Natural-language extraction for the booking domain: intent, dates,
//! times, phone numbers, names, approval, and catalog matching.
//!
//! Everything here is pure text-in / struct-out. Rules are ordered and the
//! first match wins; each rule lives behind a named function with its own
//! tests rather than one monolithic pattern.

pub mod catalog;
pub mod contact;
pub mod date;
mod scan;
pub mod time;

use chrono::NaiveDate;

pub use catalog::match_by_name;
pub use contact::{extract_name, extract_phone, has_approval, says_no_preference};
pub use date::{has_date_token, next_weekday, parse_weekday, resolve_target_date, ResolvedDate};
pub use time::{extract_time, has_time_token, normalize_ambiguous_hour};

const BOOKING_KEYWORDS: &[&str] = &[
    "appointment",
    "appointments",
    "book",
    "booking",
    "reserve",
    "reservation",
    "available",
    "availability",
    "schedule",
];

/// Booking-intent detection: an explicit keyword, or a time token together
/// with a date token, so "Friday at five" enters the booking flow even
/// without the word "appointment".
pub fn has_booking_intent(text: &str, today: NaiveDate) -> bool {
    let lowered = text.to_lowercase();
    if words(&lowered).iter().any(|token| BOOKING_KEYWORDS.contains(&token.as_str())) {
        return true;
    }
    has_time_token(text) && has_date_token(text, today)
}

/// Lowercase word tokens; apostrophes stay inside a token ("o'clock").
pub(crate) fn words(lowered: &str) -> Vec<String> {
    lowered
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_matches('\'').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::has_booking_intent;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).expect("valid test date")
    }

    #[test]
    fn explicit_keywords_signal_intent() {
        assert!(has_booking_intent("I need an appointment", today()));
        assert!(has_booking_intent("can I book something", today()));
        assert!(has_booking_intent("what slots are available", today()));
    }

    #[test]
    fn date_plus_time_signals_intent_without_keywords() {
        assert!(has_booking_intent("friday at five", today()));
        assert!(has_booking_intent("tomorrow 14:30", today()));
    }

    #[test]
    fn chit_chat_does_not_signal_intent() {
        assert!(!has_booking_intent("hello, how are you?", today()));
        // A date alone is not intent.
        assert!(!has_booking_intent("friday was great", today()));
        // A time alone is not intent either.
        assert!(!has_booking_intent("it is 14:30 now", today()));
    }
}
