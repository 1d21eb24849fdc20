//! End-of-interaction predicate over outgoing reply text. The telephony
//! layer calls this to decide whether to keep listening after speaking a
//! reply.

use crate::dialog::directive::parse_booking_directive;

const CLOSING_PHRASES: &[&str] =
    &["have a good day", "have a nice day", "goodbye", "good bye", "see you", "take care"];

pub fn is_closing_reply(text: &str) -> bool {
    if parse_booking_directive(text).is_some() {
        return true;
    }
    let lowered = text.to_lowercase();
    CLOSING_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
