use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::business::BusinessId;

/// Minute-precision local timestamps are rendered as `YYYY-MM-DD HH:MM`
/// everywhere a slot crosses a boundary (storage, directives, replies).
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_slot(slot: NaiveDateTime) -> String {
    slot.format(SLOT_FORMAT).to_string()
}

pub fn parse_slot(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), SLOT_FORMAT).ok()
}

/// The uniqueness domain: at most one committed appointment may exist per
/// key, no matter how many booking attempts race for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub business: BusinessId,
    pub start: NaiveDateTime,
}

/// A committed booking. Created only by a successful ledger commit, never
/// mutated afterwards; cancellation is out of scope for this core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub business_id: BusinessId,
    pub session_id: String,
    pub start: NaiveDateTime,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_name: String,
    pub staff_name: String,
    pub duration_minutes: u32,
    pub price_minor: i64,
    /// The external calendar the booking was synced to; empty when the
    /// business has no calendar configured.
    pub calendar_id: String,
    pub created_at: DateTime<Utc>,
}

/// Input to a ledger commit, assembled by the conversation layer once
/// name, phone, and approval are all present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    pub session_id: String,
    pub start: NaiveDateTime,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_name: String,
    pub staff_name: String,
    pub duration_minutes: u32,
    pub price_minor: i64,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_slot, parse_slot};

    #[test]
    fn slot_format_round_trips() {
        let slot = NaiveDate::from_ymd_opt(2026, 2, 16)
            .expect("valid date")
            .and_hms_opt(14, 30, 0)
            .expect("valid time");

        let rendered = format_slot(slot);
        assert_eq!(rendered, "2026-02-16 14:30");
        assert_eq!(parse_slot(&rendered), Some(slot));
        assert_eq!(parse_slot(" 2026-02-16 14:30 "), Some(slot));
    }

    #[test]
    fn malformed_slot_strings_do_not_parse() {
        assert_eq!(parse_slot("2026-02-16"), None);
        assert_eq!(parse_slot("16.02.2026 14:30"), None);
    }
}
