//! The booking directive line convention. The reply generator is prompted
//! to emit `BOOKING: YYYY-MM-DD HH:MM | Name Surname | phone` once it has
//! collected everything; the dialogue engine parses that line, runs the
//! normal commit path, and strips the marker from the user-facing text.

use chrono::NaiveDateTime;

use crate::domain::parse_slot;

pub const BOOKING_MARKER: &str = "BOOKING:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDirective {
    pub start: NaiveDateTime,
    pub customer_name: String,
    pub customer_phone: String,
}

/// First well-formed directive line in the text, if any.
pub fn parse_booking_directive(text: &str) -> Option<BookingDirective> {
    for line in text.lines() {
        let Some(rest) = line.trim().strip_prefix(BOOKING_MARKER) else {
            continue;
        };

        let mut fields = rest.splitn(3, '|');
        let start = parse_slot(fields.next()?.trim())?;
        let customer_name = fields.next()?.trim().to_string();
        let customer_phone =
            fields.next()?.split_whitespace().next().unwrap_or_default().to_string();

        if customer_name.is_empty() || customer_phone.is_empty() {
            continue;
        }
        return Some(BookingDirective { start, customer_name, customer_phone });
    }
    None
}

/// Remove every directive line, keeping the conversational remainder.
pub fn strip_directive_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with(BOOKING_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use crate::domain::parse_slot;

    use super::{parse_booking_directive, strip_directive_lines};

    #[test]
    fn well_formed_directive_parses() {
        let text = "All set!\nBOOKING: 2026-02-16 14:30 | Jane Doe | 05551234567\n";
        let directive = parse_booking_directive(text).expect("directive");
        assert_eq!(directive.start, parse_slot("2026-02-16 14:30").expect("slot"));
        assert_eq!(directive.customer_name, "Jane Doe");
        assert_eq!(directive.customer_phone, "05551234567");
    }

    #[test]
    fn malformed_directives_are_ignored() {
        assert!(parse_booking_directive("BOOKING: tomorrow | Jane | 123").is_none());
        assert!(parse_booking_directive("BOOKING: 2026-02-16 14:30 | | 123").is_none());
        assert!(parse_booking_directive("no directive here").is_none());
    }

    #[test]
    fn stripping_keeps_the_conversational_text() {
        let text = "Your appointment is set.\nBOOKING: 2026-02-16 14:30 | Jane Doe | 0555\nSee you!";
        assert_eq!(strip_directive_lines(text), "Your appointment is set.\nSee you!");
        assert_eq!(strip_directive_lines("BOOKING: 2026-02-16 14:30 | Jane Doe | 0555"), "");
    }
}
