use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bookline_core::errors::CalendarError;
use bookline_core::schedule::{BusyInterval, FreeBusySource};

/// Calendar backend client speaking a Google-style REST surface:
/// `POST {base}/freeBusy` for busy intervals and
/// `POST {base}/calendars/{id}/events` for event creation.
pub struct HttpCalendarClient {
    base_url: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpCalendarClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.map(SecretString::from),
            client,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl FreeBusySource for HttpCalendarClient {
    async fn freebusy(
        &self,
        calendar_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let url = format!("{}/freeBusy", self.base_url);
        let body = FreeBusyQuery {
            time_min: to_wire_time(from),
            time_max: to_wire_time(to),
            items: vec![FreeBusyItem { id: calendar_id.to_string() }],
        };

        let response = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Status(status.as_u16()));
        }

        let payload: FreeBusyResponse =
            response.json().await.map_err(|error| CalendarError::Decode(error.to_string()))?;

        let intervals = payload
            .calendars
            .get(calendar_id)
            .map(|calendar| calendar.busy.as_slice())
            .unwrap_or_default();

        Ok(decode_busy_intervals(intervals))
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
        summary: &str,
        description: &str,
    ) -> Result<(), CalendarError> {
        let url = format!("{}/calendars/{calendar_id}/events", self.base_url);
        let end = start + chrono::Duration::minutes(i64::from(duration_minutes));
        let body = EventInsert {
            summary: summary.to_string(),
            description: description.to_string(),
            start: EventTime { date_time: to_wire_time(start) },
            end: EventTime { date_time: to_wire_time(end) },
        };

        let response = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Status(status.as_u16()));
        }

        tracing::debug!(
            event_name = "calendar.event_created",
            calendar_id,
            start = %start,
            "external calendar event created"
        );
        Ok(())
    }
}

/// Stand-in for deployments without a calendar backend. Free/busy errors
/// (so availability uses local data only); event creation succeeds as a
/// no-op, which keeps businesses that carry a calendar id bookable when
/// the operator never configured a backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCalendar;

#[async_trait]
impl FreeBusySource for NoopCalendar {
    async fn freebusy(
        &self,
        _calendar_id: &str,
        _from: NaiveDateTime,
        _to: NaiveDateTime,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        Err(CalendarError::Transport("no calendar backend configured".to_string()))
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

fn transport_error(error: reqwest::Error) -> CalendarError {
    if error.is_timeout() {
        CalendarError::Timeout
    } else {
        CalendarError::Transport(error.to_string())
    }
}

/// Wire times are the business's wall clock: RFC3339 offsets are honored
/// for the clock value they carry, bare timestamps pass through as-is.
fn to_wire_time(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn from_wire_time(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.naive_local());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok()
}

fn decode_busy_intervals(intervals: &[WireInterval]) -> Vec<BusyInterval> {
    intervals
        .iter()
        .filter_map(|interval| {
            let start = from_wire_time(&interval.start)?;
            let end = from_wire_time(&interval.end)?;
            (end > start).then_some(BusyInterval { start, end })
        })
        .collect()
}

#[derive(Serialize)]
struct FreeBusyQuery {
    #[serde(rename = "timeMin")]
    time_min: String,
    #[serde(rename = "timeMax")]
    time_max: String,
    items: Vec<FreeBusyItem>,
}

#[derive(Serialize)]
struct FreeBusyItem {
    id: String,
}

#[derive(Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, CalendarBusy>,
}

#[derive(Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<WireInterval>,
}

#[derive(Deserialize)]
struct WireInterval {
    start: String,
    end: String,
}

#[derive(Serialize)]
struct EventInsert {
    summary: String,
    description: String,
    start: EventTime,
    end: EventTime,
}

#[derive(Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use bookline_core::schedule::FreeBusySource;

    use super::{decode_busy_intervals, from_wire_time, to_wire_time, NoopCalendar, WireInterval};

    fn at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 13)
            .expect("valid date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid time")
    }

    #[test]
    fn wire_times_round_trip() {
        let start = at(14, 30);
        let wire = to_wire_time(start);
        assert_eq!(wire, "2026-02-13T14:30:00");
        assert_eq!(from_wire_time(&wire), Some(start));
    }

    #[test]
    fn rfc3339_offsets_keep_the_clock_value() {
        assert_eq!(from_wire_time("2026-02-13T14:30:00+03:00"), Some(at(14, 30)));
        assert_eq!(from_wire_time("2026-02-13T14:30:00Z"), Some(at(14, 30)));
        assert_eq!(from_wire_time("not a time"), None);
    }

    #[test]
    fn busy_decoding_drops_malformed_and_empty_intervals() {
        let intervals = vec![
            WireInterval {
                start: "2026-02-13T10:00:00".to_string(),
                end: "2026-02-13T11:00:00".to_string(),
            },
            WireInterval { start: "garbage".to_string(), end: "garbage".to_string() },
            WireInterval {
                start: "2026-02-13T12:00:00".to_string(),
                end: "2026-02-13T12:00:00".to_string(),
            },
        ];

        let decoded = decode_busy_intervals(&intervals);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].start, at(10, 0));
        assert_eq!(decoded[0].end, at(11, 0));
    }

    #[tokio::test]
    async fn noop_calendar_fails_freebusy_but_accepts_events() {
        let calendar = NoopCalendar;
        assert!(calendar.freebusy("cal-1", at(0, 0), at(23, 0)).await.is_err());
        assert!(calendar.create_event("cal-1", at(14, 0), 30, "x", "y").await.is_ok());
    }
}
