//! Slot availability reconciliation: generate the candidate grid from the
//! working-hours spec, subtract external busy intervals when a calendar is
//! configured, then subtract locally committed bookings. The local ledger
//! is authoritative: a slot it holds is never offered, whatever the
//! external source claims.

pub mod hours;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{Appointment, BookingRequest, BusinessContext, BusinessId};
use crate::errors::{AvailabilityError, CalendarError, StoreError};

/// Upper bound on a single availability answer.
const MAX_CANDIDATES: usize = 200;

/// Default grid spacing between slot starts.
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

/// A bookable slot offered to the user. Generated, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub start: NaiveDateTime,
    pub display: String,
}

impl SlotCandidate {
    fn new(start: NaiveDateTime) -> Self {
        Self { start, display: start.format("%d.%m.%Y %H:%M").to_string() }
    }
}

/// An occupied interval reported by the external calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// External calendar collaborator: free/busy lookup and event creation.
#[async_trait]
pub trait FreeBusySource: Send + Sync {
    async fn freebusy(
        &self,
        calendar_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
        summary: &str,
        description: &str,
    ) -> Result<(), CalendarError>;
}

/// Outcome of an appointment insert attempt.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Appointment),
    /// The unique `(business, slot)` constraint rejected the row: a
    /// concurrent commit won the race.
    Conflict,
}

/// Persistence port for committed appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Start timestamps already booked for this business within
    /// `[from, to)`.
    async fn booked_starts(
        &self,
        business: &BusinessId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, StoreError>;

    /// Point lookup for one exact key.
    async fn slot_taken(
        &self,
        business: &BusinessId,
        start: NaiveDateTime,
    ) -> Result<bool, StoreError>;

    /// Insert enforcing the `(business, slot)` uniqueness constraint.
    async fn insert(
        &self,
        business: &BusinessId,
        request: &BookingRequest,
        calendar_id: &str,
    ) -> Result<InsertOutcome, StoreError>;
}

/// The availability engine proper. Holds the ledger and the external
/// free/busy source; all time arithmetic takes `now` explicitly.
#[derive(Clone)]
pub struct AvailabilityEngine {
    store: Arc<dyn AppointmentStore>,
    calendar: Arc<dyn FreeBusySource>,
}

impl AvailabilityEngine {
    pub fn new(store: Arc<dyn AppointmentStore>, calendar: Arc<dyn FreeBusySource>) -> Self {
        Self { store, calendar }
    }

    /// Ordered future slot candidates for `days` days starting today.
    pub async fn available_slots(
        &self,
        business: &BusinessContext,
        days: u32,
        slot_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<SlotCandidate>, AvailabilityError> {
        let slot_minutes = slot_minutes.clamp(5, 24 * 60);
        let from = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
        let to = from + Duration::days(i64::from(days));

        let booked: HashSet<NaiveDateTime> = self
            .store
            .booked_starts(&business.id, from, to)
            .await
            .map_err(|error| AvailabilityError::Store(error.to_string()))?
            .into_iter()
            .collect();

        let busy = match business.calendar_id() {
            Some(calendar_id) => match self.calendar.freebusy(calendar_id, from, to).await {
                Ok(busy) => Some(busy),
                Err(error) => {
                    tracing::warn!(
                        event_name = "schedule.freebusy_fallback",
                        business_id = %business.id,
                        error = %error,
                        "free/busy lookup failed, using local availability only"
                    );
                    None
                }
            },
            None => None,
        };

        let (start_minute, end_minute) = hours::daily_window_or_default(&business.working_hours);
        let allowed = hours::allowed_weekdays(&business.working_hours);

        let mut candidates = Vec::new();
        for day_offset in 0..days {
            let day = from + Duration::days(i64::from(day_offset));
            for minute in (start_minute..end_minute).step_by(slot_minutes as usize) {
                let Some(start) =
                    day.date().and_hms_opt(minute / 60, minute % 60, 0)
                else {
                    continue;
                };
                let end = start + Duration::minutes(i64::from(slot_minutes));

                if start <= now {
                    continue;
                }
                if let Some(busy) = &busy {
                    if busy.iter().any(|interval| overlaps(start, end, interval)) {
                        continue;
                    }
                }
                if booked.contains(&start) {
                    continue;
                }
                if let Some(allowed) = &allowed {
                    if !allowed.contains(&start.date().weekday()) {
                        continue;
                    }
                }

                candidates.push(SlotCandidate::new(start));
                if candidates.len() >= MAX_CANDIDATES {
                    return Ok(candidates);
                }
            }
        }

        Ok(candidates)
    }

    /// The single commit gate: false when the ledger already holds the
    /// key, otherwise the slot must appear in an availability answer whose
    /// range is guaranteed to cover the target date. Absence covers
    /// weekday mismatch, past times, and outside-hours cases uniformly.
    pub async fn is_currently_available(
        &self,
        business: &BusinessContext,
        slot: NaiveDateTime,
        slot_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<bool, AvailabilityError> {
        let taken = self
            .store
            .slot_taken(&business.id, slot)
            .await
            .map_err(|error| AvailabilityError::Store(error.to_string()))?;
        if taken {
            return Ok(false);
        }

        let days_until = (slot.date() - now.date()).num_days();
        if days_until < 0 {
            return Ok(false);
        }
        let days = (days_until + 2).max(7) as u32;

        let candidates = self.available_slots(business, days, slot_minutes, now).await?;
        Ok(candidates.iter().any(|candidate| candidate.start == slot))
    }
}

/// Half-open interval overlap: `start < busy.end && end > busy.start`.
fn overlaps(start: NaiveDateTime, end: NaiveDateTime, busy: &BusyInterval) -> bool {
    start < busy.end && end > busy.start
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::booking::memory::InMemoryAppointmentStore;
    use crate::domain::{BookingRequest, BusinessContext, BusinessId, SLOT_FORMAT};
    use crate::errors::CalendarError;
    use crate::schedule::{
        AppointmentStore, AvailabilityEngine, BusyInterval, FreeBusySource, SlotCandidate,
    };

    #[derive(Default)]
    struct StaticCalendar {
        busy: Vec<BusyInterval>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl FreeBusySource for StaticCalendar {
        async fn freebusy(
            &self,
            _calendar_id: &str,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<Vec<BusyInterval>, CalendarError> {
            if self.fail {
                return Err(CalendarError::Timeout);
            }
            Ok(self.busy.clone())
        }

        async fn create_event(
            &self,
            _calendar_id: &str,
            _start: NaiveDateTime,
            _duration_minutes: u32,
            _summary: &str,
            _description: &str,
        ) -> Result<(), CalendarError> {
            Ok(())
        }
    }

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .expect("valid date")
            .and_hms_opt(time.0, time.1, 0)
            .expect("valid time")
    }

    // Monday 2026-02-09, 08:00 local.
    fn now() -> NaiveDateTime {
        at((2026, 2, 9), (8, 0))
    }

    fn business(calendar_id: Option<&str>) -> BusinessContext {
        BusinessContext {
            id: BusinessId("demo-salon".to_string()),
            name: "Demo Salon".to_string(),
            agent_name: "Mia".to_string(),
            sector: String::new(),
            address: String::new(),
            working_hours: "Mon-Fri 09:00-18:00".to_string(),
            services: Vec::new(),
            staff: Vec::new(),
            calendar_id: calendar_id.map(String::from),
        }
    }

    fn engine_with(
        store: Arc<InMemoryAppointmentStore>,
        calendar: StaticCalendar,
    ) -> AvailabilityEngine {
        AvailabilityEngine::new(store, Arc::new(calendar))
    }

    fn request(start: NaiveDateTime) -> BookingRequest {
        BookingRequest {
            session_id: "s-1".to_string(),
            start,
            customer_name: "Jane Doe".to_string(),
            customer_phone: "05551234567".to_string(),
            service_name: String::new(),
            staff_name: String::new(),
            duration_minutes: 30,
            price_minor: 0,
        }
    }

    fn starts(candidates: &[SlotCandidate]) -> Vec<String> {
        candidates.iter().map(|c| c.start.format(SLOT_FORMAT).to_string()).collect()
    }

    #[tokio::test]
    async fn grid_is_future_only_ordered_and_weekday_filtered() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let engine = engine_with(store, StaticCalendar::default());

        let slots = engine
            .available_slots(&business(None), 7, 30, now())
            .await
            .expect("slots");

        assert!(!slots.is_empty());
        // Strictly increasing, all in the future.
        assert!(slots.windows(2).all(|pair| pair[0].start < pair[1].start));
        assert!(slots.iter().all(|slot| slot.start > now()));
        // Working hours respected; Sat/Sun excluded.
        assert!(slots.iter().all(|slot| {
            use chrono::{Datelike, Timelike, Weekday};
            let weekday = slot.start.date().weekday();
            weekday != Weekday::Sat
                && weekday != Weekday::Sun
                && slot.start.hour() >= 9
                && slot.start.hour() < 18
        }));
        assert_eq!(slots[0].display, slots[0].start.format("%d.%m.%Y %H:%M").to_string());
    }

    #[tokio::test]
    async fn ledger_bookings_are_excluded_from_the_grid() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let taken = at((2026, 2, 10), (14, 0));
        store
            .insert(&BusinessId("demo-salon".to_string()), &request(taken), "")
            .await
            .expect("insert");

        let engine = engine_with(store, StaticCalendar::default());
        let slots = engine.available_slots(&business(None), 7, 30, now()).await.expect("slots");

        assert!(!starts(&slots).contains(&"2026-02-10 14:00".to_string()));
        assert!(starts(&slots).contains(&"2026-02-10 14:30".to_string()));
    }

    #[tokio::test]
    async fn ledger_wins_even_when_external_source_reports_free() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let taken = at((2026, 2, 10), (14, 0));
        store
            .insert(&BusinessId("demo-salon".to_string()), &request(taken), "cal-1")
            .await
            .expect("insert");

        // External calendar reports no busy intervals at all.
        let engine = engine_with(store, StaticCalendar::default());
        let slots = engine
            .available_slots(&business(Some("cal-1")), 7, 30, now())
            .await
            .expect("slots");

        assert!(!starts(&slots).contains(&"2026-02-10 14:00".to_string()));
    }

    #[tokio::test]
    async fn busy_intervals_remove_overlapping_candidates() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let calendar = StaticCalendar {
            busy: vec![BusyInterval {
                start: at((2026, 2, 10), (10, 0)),
                end: at((2026, 2, 10), (11, 0)),
            }],
            fail: false,
        };
        let engine = engine_with(store, calendar);
        let slots = engine
            .available_slots(&business(Some("cal-1")), 7, 30, now())
            .await
            .expect("slots");
        let listed = starts(&slots);

        assert!(!listed.contains(&"2026-02-10 10:00".to_string()));
        assert!(!listed.contains(&"2026-02-10 10:30".to_string()));
        // Half-open: a candidate ending exactly at busy start survives.
        assert!(listed.contains(&"2026-02-10 09:30".to_string()));
        assert!(listed.contains(&"2026-02-10 11:00".to_string()));
    }

    #[tokio::test]
    async fn freebusy_failure_degrades_to_local_grid() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let engine = engine_with(store, StaticCalendar { busy: Vec::new(), fail: true });

        let slots = engine
            .available_slots(&business(Some("cal-1")), 7, 30, now())
            .await
            .expect("slots");
        assert!(!slots.is_empty());
    }

    #[tokio::test]
    async fn point_query_gates_on_ledger_grid_and_past() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let engine = engine_with(store.clone(), StaticCalendar::default());
        let biz = business(None);

        // Open Tuesday slot: available.
        let open = at((2026, 2, 10), (14, 0));
        assert!(engine.is_currently_available(&biz, open, 30, now()).await.expect("query"));

        // Saturday is outside the working days.
        let saturday = at((2026, 2, 14), (14, 0));
        assert!(!engine.is_currently_available(&biz, saturday, 30, now()).await.expect("query"));

        // Outside the daily window.
        let late = at((2026, 2, 10), (20, 0));
        assert!(!engine.is_currently_available(&biz, late, 30, now()).await.expect("query"));

        // In the past.
        let past = at((2026, 2, 6), (14, 0));
        assert!(!engine.is_currently_available(&biz, past, 30, now()).await.expect("query"));

        // Booked: the ledger short-circuits.
        store.insert(&biz.id, &request(open), "").await.expect("insert");
        assert!(!engine.is_currently_available(&biz, open, 30, now()).await.expect("query"));
    }

    #[tokio::test]
    async fn point_query_covers_targets_beyond_the_default_week() {
        let store = Arc::new(InMemoryAppointmentStore::default());
        let engine = engine_with(store, StaticCalendar::default());

        // 2026-02-19 is a Thursday, 10 days out; the range must stretch.
        let far = at((2026, 2, 19), (14, 0));
        assert!(engine
            .is_currently_available(&business(None), far, 30, now())
            .await
            .expect("query"));
    }
}
