use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookline_core::dialog::{is_closing_reply, DialogEngine};
use bookline_core::domain::BusinessContext;
use bookline_core::schedule::SlotCandidate;
use bookline_db::{DbPool, NewBusiness, RepositoryError, SqlBusinessDirectory};

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub directory: SqlBusinessDirectory,
    pub dialog: Arc<DialogEngine>,
    pub slot_minutes: u32,
    pub lookahead_days: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/businesses", get(list_businesses).post(create_business))
        .route("/api/businesses/{slug}", get(get_business).delete(delete_business))
        .route("/api/businesses/{slug}/slots", get(list_slots))
        .route("/api/chat/{slug}", post(chat_turn))
        .route("/api/reset", post(reset_session))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string()),
            Self::Internal(message) => {
                tracing::error!(event_name = "api.internal_error", error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub async fn list_businesses(
    State(state): State<AppState>,
) -> Result<Json<Vec<BusinessContext>>, ApiError> {
    Ok(Json(state.directory.list().await?))
}

pub async fn create_business(
    State(state): State<AppState>,
    Json(input): Json<NewBusiness>,
) -> Result<(StatusCode, Json<BusinessContext>), ApiError> {
    let created = state.directory.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_business(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BusinessContext>, ApiError> {
    let business =
        state.directory.fetch(&slug).await?.ok_or(ApiError::NotFound("business not found"))?;
    Ok(Json(business))
}

pub async fn delete_business(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.directory.deactivate(&slug).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub days: Option<u32>,
    pub slot_minutes: Option<u32>,
}

pub async fn list_slots(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<SlotCandidate>>, ApiError> {
    let business =
        state.directory.fetch(&slug).await?.ok_or(ApiError::NotFound("business not found"))?;

    let slots = state
        .dialog
        .ledger()
        .availability()
        .available_slots(
            &business,
            query.days.unwrap_or(state.lookahead_days),
            query.slot_minutes.unwrap_or(state.slot_minutes),
            Local::now().naive_local(),
        )
        .await
        .map_err(|error| ApiError::Internal(error.to_string()))?;

    Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub end_of_interaction: bool,
}

pub async fn chat_turn(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let business =
        state.directory.fetch(&slug).await?.ok_or(ApiError::NotFound("business not found"))?;

    let session_id = request
        .session_id
        .filter(|session_id| !session_id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .dialog
        .handle_turn(&business, &session_id, &request.message, Local::now().naive_local())
        .await;
    let end_of_interaction = is_closing_reply(&reply);

    tracing::info!(
        event_name = "api.chat_turn",
        business_id = %business.id,
        session_id = %session_id,
        end_of_interaction,
        "chat turn handled"
    );

    Ok(Json(ChatResponse { session_id, reply, end_of_interaction }))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

pub async fn reset_session(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Json<serde_json::Value> {
    state.dialog.sessions().clear(&request.session_id);
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::Json;

    use bookline_agent::CannedReplyGenerator;
    use bookline_calendar::NoopCalendar;
    use bookline_core::dialog::DialogEngine;
    use bookline_core::session::SessionStore;
    use bookline_core::BookingLedger;
    use bookline_db::{
        connect_with_settings, migrations, seed_demo_business, SqlAppointmentStore,
        SqlBusinessDirectory,
    };

    use super::{chat_turn, get_business, list_slots, AppState, ChatRequest, SlotsQuery};

    pub async fn memory_state() -> AppState {
        let db_pool = connect_with_settings("sqlite::memory:?cache=shared", 2, 5)
            .await
            .expect("pool connects");
        migrations::run_pending(&db_pool).await.expect("migrations");

        let directory = SqlBusinessDirectory::new(db_pool.clone());
        let store = Arc::new(SqlAppointmentStore::new(db_pool.clone()));
        let ledger = BookingLedger::new(store, Arc::new(NoopCalendar));
        let dialog = Arc::new(DialogEngine::new(
            Arc::new(SessionStore::default()),
            ledger,
            Arc::new(CannedReplyGenerator),
            30,
            7,
        ));

        AppState { db_pool, directory, dialog, slot_minutes: 30, lookahead_days: 7 }
    }

    #[tokio::test]
    async fn unknown_business_is_a_not_found() {
        let state = memory_state().await;
        let result = get_business(State(state.clone()), Path("missing".to_string())).await;
        assert!(result.is_err());
        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn slots_endpoint_returns_candidates_for_seeded_business() {
        let state = memory_state().await;
        seed_demo_business(&state.directory).await.expect("seed");

        let Json(slots) = list_slots(
            State(state.clone()),
            Path("demo-salon".to_string()),
            Query(SlotsQuery { days: Some(7), slot_minutes: Some(30) }),
        )
        .await
        .expect("slots");

        assert!(slots.windows(2).all(|pair| pair[0].start < pair[1].start));
        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn chat_turn_assigns_a_session_and_replies() {
        let state = memory_state().await;
        seed_demo_business(&state.directory).await.expect("seed");

        let Json(response) = chat_turn(
            State(state.clone()),
            Path("demo-salon".to_string()),
            Json(ChatRequest { message: "hello there".to_string(), session_id: None }),
        )
        .await
        .expect("chat");

        assert!(!response.session_id.is_empty());
        assert!(!response.reply.is_empty());
        assert!(!response.end_of_interaction);
        state.db_pool.close().await;
    }
}
