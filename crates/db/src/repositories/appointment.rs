use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;

use bookline_core::domain::{format_slot, parse_slot, Appointment, BookingRequest, BusinessId};
use bookline_core::errors::StoreError;
use bookline_core::schedule::{AppointmentStore, InsertOutcome};

use crate::DbPool;

/// SQLite-backed appointment ledger. The unique index on
/// `(business_slug, slot_at)` is the serialization point for concurrent
/// commits.
#[derive(Clone)]
pub struct SqlAppointmentStore {
    pool: DbPool,
}

impl SqlAppointmentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_business(&self, business: &BusinessId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments WHERE business_slug = ?",
        )
        .bind(&business.0)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)
    }
}

#[async_trait]
impl AppointmentStore for SqlAppointmentStore {
    async fn booked_starts(
        &self,
        business: &BusinessId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>, StoreError> {
        let rows = sqlx::query(
            "SELECT slot_at FROM appointments
             WHERE business_slug = ? AND slot_at >= ? AND slot_at < ?",
        )
        .bind(&business.0)
        .bind(format_slot(from))
        .bind(format_slot(to))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        // Slot keys are stored as `YYYY-MM-DD HH:MM` text, so range scans
        // compare lexicographically and decode losslessly here.
        let mut starts = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("slot_at");
            let start = parse_slot(&raw)
                .ok_or_else(|| StoreError::Decode(format!("bad slot_at value `{raw}`")))?;
            starts.push(start);
        }
        Ok(starts)
    }

    async fn slot_taken(
        &self,
        business: &BusinessId,
        start: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments WHERE business_slug = ? AND slot_at = ?",
        )
        .bind(&business.0)
        .bind(format_slot(start))
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(found > 0)
    }

    async fn insert(
        &self,
        business: &BusinessId,
        request: &BookingRequest,
        calendar_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO appointments (
                business_slug, session_id, slot_at, customer_name, customer_phone,
                service_name, staff_name, duration_minutes, price_minor, calendar_id,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&business.0)
        .bind(&request.session_id)
        .bind(format_slot(request.start))
        .bind(&request.customer_name)
        .bind(&request.customer_phone)
        .bind(&request.service_name)
        .bind(&request.staff_name)
        .bind(request.duration_minutes)
        .bind(request.price_minor)
        .bind(calendar_id)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(InsertOutcome::Inserted(appointment_from(
                done.last_insert_rowid(),
                business,
                request,
                calendar_id,
                created_at,
            ))),
            Err(sqlx::Error::Database(db_error))
                if matches!(db_error.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                Ok(InsertOutcome::Conflict)
            }
            Err(error) => Err(query_error(error)),
        }
    }
}

fn appointment_from(
    id: i64,
    business: &BusinessId,
    request: &BookingRequest,
    calendar_id: &str,
    created_at: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id,
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
        created_at,
    }
}

fn query_error(error: sqlx::Error) -> StoreError {
    StoreError::Query(error.to_string())
}
