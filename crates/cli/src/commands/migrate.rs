use bookline_core::config::{AppConfig, LoadOptions};
use bookline_db::{connect_with_settings, migrations};

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("migrate", "config", error.to_string(), 2),
    };

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("migrate", "database", error.to_string(), 2),
    };

    match migrations::run_pending(&pool).await {
        Ok(()) => CommandResult::success(
            "migrate",
            format!("migrations applied to {}", config.database.url),
        ),
        Err(error) => CommandResult::failure("migrate", "migration", error.to_string(), 2),
    }
}
