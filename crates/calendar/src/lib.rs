//! HTTP client for the external calendar collaborator: free/busy lookup
//! and event creation, both with bounded timeouts. A failed free/busy
//! call degrades the availability engine to local data; a failed event
//! insert fails the booking commit.

mod client;

pub use client::{HttpCalendarClient, NoopCalendar};
