use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures surfaced by the booking commit path.
///
/// `SlotUnavailable` and `SlotConflict` are reported to the user the same
/// way (the slot cannot be booked, pick another); they are distinct because
/// `SlotConflict` means a concurrent commit won the race after the
/// availability pre-check had already passed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("invalid booking request: {0}")]
    Validation(String),
    #[error("slot {slot} is not available")]
    SlotUnavailable { slot: NaiveDateTime },
    #[error("slot {slot} was booked by a concurrent request")]
    SlotConflict { slot: NaiveDateTime },
    #[error("external calendar sync failed: {0}")]
    ExternalSyncFailed(String),
    #[error("appointment store failure: {0}")]
    Store(String),
}

impl BookingError {
    /// True for the two "someone else holds this slot" outcomes, which the
    /// conversation layer treats identically.
    pub fn is_slot_taken(&self) -> bool {
        matches!(self, Self::SlotUnavailable { .. } | Self::SlotConflict { .. })
    }
}

/// Failures while computing availability. External-source errors are not in
/// this enum on purpose: a broken free/busy source degrades to the local
/// grid instead of failing the query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("appointment store failure: {0}")]
    Store(String),
}

impl From<AvailabilityError> for BookingError {
    fn from(value: AvailabilityError) -> Self {
        match value {
            AvailabilityError::Store(message) => Self::Store(message),
        }
    }
}

/// Errors from the external calendar collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("calendar request timed out")]
    Timeout,
    #[error("calendar request failed: {0}")]
    Transport(String),
    #[error("calendar returned status {0}")]
    Status(u16),
    #[error("calendar response could not be decoded: {0}")]
    Decode(String),
}

/// Errors from persistence-backed collaborators (appointment store,
/// business directory).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Query(String),
    #[error("stored row could not be decoded: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{AvailabilityError, BookingError};

    #[test]
    fn conflict_and_unavailable_both_read_as_slot_taken() {
        let slot = NaiveDate::from_ymd_opt(2026, 2, 16)
            .expect("valid date")
            .and_hms_opt(14, 0, 0)
            .expect("valid time");

        assert!(BookingError::SlotUnavailable { slot }.is_slot_taken());
        assert!(BookingError::SlotConflict { slot }.is_slot_taken());
        assert!(!BookingError::Validation("empty slot".to_string()).is_slot_taken());
    }

    #[test]
    fn availability_store_failures_map_into_booking_errors() {
        let error: BookingError = AvailabilityError::Store("locked".to_string()).into();
        assert!(matches!(error, BookingError::Store(message) if message == "locked"));
    }
}
