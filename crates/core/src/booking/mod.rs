//! The booking ledger commit path. Ordering is fixed: validate, pass the
//! availability gate, create the external calendar event when one is
//! configured, then insert under the uniqueness constraint. A failed
//! external insert aborts the commit before anything is written locally,
//! so a synced calendar can never drift ahead of the ledger.

pub mod memory;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{format_slot, Appointment, BookingRequest, BusinessContext};
use crate::errors::BookingError;
use crate::schedule::{
    AppointmentStore, AvailabilityEngine, FreeBusySource, InsertOutcome, DEFAULT_SLOT_MINUTES,
};

#[derive(Clone)]
pub struct BookingLedger {
    store: Arc<dyn AppointmentStore>,
    calendar: Arc<dyn FreeBusySource>,
    engine: AvailabilityEngine,
    slot_minutes: u32,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn AppointmentStore>, calendar: Arc<dyn FreeBusySource>) -> Self {
        let engine = AvailabilityEngine::new(store.clone(), calendar.clone());
        Self { store, calendar, engine, slot_minutes: DEFAULT_SLOT_MINUTES }
    }

    /// Grid spacing used by the availability gate. Must match the grid
    /// slots are offered from, or committed slots would fail validation.
    pub fn with_slot_minutes(mut self, slot_minutes: u32) -> Self {
        self.slot_minutes = slot_minutes.clamp(5, 24 * 60);
        self
    }

    pub fn availability(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Commit one appointment. Every code path that books a slot goes
    /// through here; there is no way to insert without the gate.
    pub async fn commit(
        &self,
        business: &BusinessContext,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, BookingError> {
        validate(request)?;

        let available = self
            .engine
            .is_currently_available(business, request.start, self.slot_minutes, now)
            .await?;
        if !available {
            return Err(BookingError::SlotUnavailable { slot: request.start });
        }

        let calendar_id = business.calendar_id().unwrap_or("");
        if !calendar_id.is_empty() {
            let summary = format!("Appointment - {}", request.customer_name);
            let description = event_description(business, request);
            self.calendar
                .create_event(
                    calendar_id,
                    request.start,
                    request.duration_minutes,
                    &summary,
                    &description,
                )
                .await
                .map_err(|error| {
                    tracing::warn!(
                        event_name = "booking.external_sync_failed",
                        business_id = %business.id,
                        slot = %format_slot(request.start),
                        error = %error,
                        "external event creation failed, aborting commit"
                    );
                    BookingError::ExternalSyncFailed(error.to_string())
                })?;
        }

        let outcome = self
            .store
            .insert(&business.id, request, calendar_id)
            .await
            .map_err(|error| BookingError::Store(error.to_string()))?;

        match outcome {
            InsertOutcome::Inserted(appointment) => {
                tracing::info!(
                    event_name = "booking.committed",
                    business_id = %business.id,
                    session_id = %request.session_id,
                    slot = %format_slot(appointment.start),
                    "appointment committed"
                );
                Ok(appointment)
            }
            InsertOutcome::Conflict => {
                Err(BookingError::SlotConflict { slot: request.start })
            }
        }
    }
}

fn validate(request: &BookingRequest) -> Result<(), BookingError> {
    if request.customer_name.trim().is_empty() {
        return Err(BookingError::Validation("customer name is required".to_string()));
    }
    if request.customer_phone.trim().is_empty() {
        return Err(BookingError::Validation("customer phone is required".to_string()));
    }
    if request.duration_minutes == 0 {
        return Err(BookingError::Validation("duration must be positive".to_string()));
    }
    Ok(())
}

fn event_description(business: &BusinessContext, request: &BookingRequest) -> String {
    let mut lines = vec![
        format!("Phone: {}", request.customer_phone),
        format!("Business: {}", business.name),
    ];

    let mut extras = Vec::new();
    if !request.service_name.is_empty() {
        extras.push(format!("Service: {}", request.service_name));
    }
    if !request.staff_name.is_empty() {
        extras.push(format!("Staff: {}", request.staff_name));
    }
    if request.price_minor > 0 {
        extras.push(format!("Price: {}", request.price_minor));
    }
    if !extras.is_empty() {
        lines.push(extras.join(" | "));
    }
    if !request.session_id.is_empty() {
        lines.push(format!("Session: {}", request.session_id));
    }
    lines.join("\n")
}
