use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use bookline_calendar::{HttpCalendarClient, NoopCalendar};
use bookline_core::config::{AppConfig, LoadOptions};
use bookline_core::schedule::{AvailabilityEngine, FreeBusySource};
use bookline_db::{connect_with_settings, migrations, SqlAppointmentStore, SqlBusinessDirectory};

use super::CommandResult;

pub async fn run(slug: &str, days: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("slots", "config", error.to_string(), 2),
    };

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("slots", "database", error.to_string(), 2),
    };

    if let Err(error) = migrations::run_pending(&pool).await {
        return CommandResult::failure("slots", "migration", error.to_string(), 2);
    }

    let directory = SqlBusinessDirectory::new(pool.clone())
        .with_default_calendar(config.calendar.default_calendar_id.clone());
    let business = match directory.fetch(slug).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return CommandResult::failure("slots", "not_found", format!("no business `{slug}`"), 1)
        }
        Err(error) => return CommandResult::failure("slots", "database", error.to_string(), 2),
    };

    let calendar: Arc<dyn FreeBusySource> = match &config.calendar.base_url {
        Some(base_url) if config.calendar_configured() => {
            match HttpCalendarClient::new(
                base_url.clone(),
                config.calendar_api_key().map(str::to_string),
                Duration::from_secs(config.calendar.timeout_secs),
            ) {
                Ok(client) => Arc::new(client),
                Err(error) => {
                    return CommandResult::failure("slots", "calendar", error.to_string(), 2)
                }
            }
        }
        _ => Arc::new(NoopCalendar),
    };

    let engine =
        AvailabilityEngine::new(Arc::new(SqlAppointmentStore::new(pool)), calendar);
    let slots = match engine
        .available_slots(&business, days, config.session.slot_minutes, Local::now().naive_local())
        .await
    {
        Ok(slots) => slots,
        Err(error) => return CommandResult::failure("slots", "availability", error.to_string(), 2),
    };

    if slots.is_empty() {
        return CommandResult::raw(0, format!("no open slots for {slug} in the next {days} days"));
    }

    let mut lines = vec![format!("{} open slots for {slug}:", slots.len())];
    lines.extend(slots.iter().map(|slot| format!("  {}", slot.display)));
    CommandResult::raw(0, lines.join("\n"))
}
