//! In-memory appointment store. Backs the engine and dialogue tests and
//! any deployment that does not need durability; the SQL store in
//! `bookline-db` is the production implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use crate::domain::{Appointment, BookingRequest, BusinessId};
use crate::errors::StoreError;
use crate::schedule::{AppointmentStore, InsertOutcome};

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    next_id: AtomicI64,
    rows: Mutex<HashMap<(String, NaiveDateTime), Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn appointments(&self) -> Vec<Appointment> {
        let rows = self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut all: Vec<Appointment> = rows.values().cloned().collect();
        all.sort_by_key(|appointment| (appointment.business_id.0.clone(), appointment.start));
        all
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn booked_starts(
        &self,
        business: &BusinessId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(rows
            .keys()
            .filter(|(id, start)| id == &business.0 && *start >= from && *start < to)
            .map(|(_, start)| *start)
            .collect())
    }

    async fn slot_taken(
        &self,
        business: &BusinessId,
        start: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(rows.contains_key(&(business.0.clone(), start)))
    }

    async fn insert(
        &self,
        business: &BusinessId,
        request: &BookingRequest,
        calendar_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (business.0.clone(), request.start);
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::Conflict);
        }

        let appointment = Appointment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            business_id: business.clone(),
            session_id: request.session_id.clone(),
            start: request.start,
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            service_name: request.service_name.clone(),
            staff_name: request.staff_name.clone(),
            duration_minutes: request.duration_minutes,
            price_minor: request.price_minor,
            calendar_id: calendar_id.to_string(),
            created_at: Utc::now(),
        };
        rows.insert(key, appointment.clone());
        Ok(InsertOutcome::Inserted(appointment))
    }
}
