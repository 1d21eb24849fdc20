use bookline_core::config::{AppConfig, LoadOptions};
use bookline_db::{connect_with_settings, migrations, seed_demo_business, SqlBusinessDirectory};

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("seed", "config", error.to_string(), 2),
    };

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("seed", "database", error.to_string(), 2),
    };

    if let Err(error) = migrations::run_pending(&pool).await {
        return CommandResult::failure("seed", "migration", error.to_string(), 2);
    }

    let directory = SqlBusinessDirectory::new(pool);
    match seed_demo_business(&directory).await {
        Ok(business) => CommandResult::success(
            "seed",
            format!("demo business ready: {} ({})", business.name, business.id),
        ),
        Err(error) => CommandResult::failure("seed", "fixture", error.to_string(), 2),
    }
}
