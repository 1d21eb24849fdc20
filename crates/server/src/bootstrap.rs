use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use bookline_agent::{CannedReplyGenerator, HttpLlmClient, LlmSettings};
use bookline_calendar::{HttpCalendarClient, NoopCalendar};
use bookline_core::config::AppConfig;
use bookline_core::dialog::{DialogEngine, ReplyError, ReplyGenerator};
use bookline_core::errors::CalendarError;
use bookline_core::schedule::FreeBusySource;
use bookline_core::session::SessionStore;
use bookline_core::BookingLedger;
use bookline_db::{connect_with_settings, migrations, DbPool, SqlAppointmentStore, SqlBusinessDirectory};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub directory: SqlBusinessDirectory,
    pub dialog: Arc<DialogEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("calendar client construction failed: {0}")]
    Calendar(#[source] CalendarError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] ReplyError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let directory = SqlBusinessDirectory::new(db_pool.clone())
        .with_default_calendar(config.calendar.default_calendar_id.clone());

    let calendar: Arc<dyn FreeBusySource> = match &config.calendar.base_url {
        Some(base_url) if config.calendar_configured() => Arc::new(
            HttpCalendarClient::new(
                base_url.clone(),
                config.calendar_api_key().map(str::to_string),
                Duration::from_secs(config.calendar.timeout_secs),
            )
            .map_err(BootstrapError::Calendar)?,
        ),
        _ => Arc::new(NoopCalendar),
    };

    let generator: Arc<dyn ReplyGenerator> = if config.llm.enabled {
        Arc::new(
            HttpLlmClient::new(LlmSettings {
                base_url: config.llm.base_url.clone(),
                api_key: config.llm_api_key().map(str::to_string),
                model: config.llm.model.clone(),
                timeout: Duration::from_secs(config.llm.timeout_secs),
                max_tokens: config.llm.max_tokens,
                temperature: config.llm.temperature,
            })
            .map_err(BootstrapError::Llm)?,
        )
    } else {
        Arc::new(CannedReplyGenerator)
    };

    let store = Arc::new(SqlAppointmentStore::new(db_pool.clone()));
    let ledger =
        BookingLedger::new(store, calendar).with_slot_minutes(config.session.slot_minutes);
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(config.session.ttl_secs)));
    let dialog = Arc::new(DialogEngine::new(
        sessions,
        ledger,
        generator,
        config.session.slot_minutes,
        config.session.lookahead_days,
    ));

    info!(
        event_name = "system.bootstrap.ready",
        llm_enabled = config.llm.enabled,
        calendar_configured = config.calendar_configured(),
        "application wired"
    );

    Ok(Application { config, db_pool, directory, dialog })
}
