use serde::Serialize;

use bookline_core::config::{AppConfig, LoadOptions};
use bookline_db::{connect_with_settings, ping};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckOutcome,
    database: CheckOutcome,
    llm: CheckOutcome,
    calendar: CheckOutcome,
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    status: &'static str,
    detail: String,
}

impl CheckOutcome {
    fn ok(detail: impl Into<String>) -> Self {
        Self { status: "ok", detail: detail.into() }
    }

    fn warn(detail: impl Into<String>) -> Self {
        Self { status: "warn", detail: detail.into() }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self { status: "fail", detail: detail.into() }
    }
}

pub async fn run(json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("doctor", "config", error.to_string(), 2);
        }
    };

    let database = match connect_with_settings(&config.database.url, 1, 5).await {
        Ok(pool) => match ping(&pool).await {
            Ok(()) => CheckOutcome::ok(format!("reachable at {}", config.database.url)),
            Err(error) => CheckOutcome::fail(format!("query failed: {error}")),
        },
        Err(error) => CheckOutcome::fail(format!("connect failed: {error}")),
    };

    let llm = if config.llm.enabled {
        CheckOutcome::ok(format!("enabled, endpoint {}", config.llm.base_url))
    } else {
        CheckOutcome::warn("disabled; chit-chat turns use the canned generator")
    };

    let calendar = if config.calendar_configured() {
        CheckOutcome::ok("external calendar configured")
    } else {
        CheckOutcome::warn("not configured; availability uses local bookings only")
    };

    let failed = database.status == "fail";
    let report = DoctorReport {
        config: CheckOutcome::ok("loaded and validated"),
        database,
        llm,
        calendar,
    };

    let exit_code = u8::from(failed);
    if json {
        let output = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
        return CommandResult::raw(exit_code, output);
    }

    let mut lines = Vec::new();
    for (name, check) in [
        ("config", &report.config),
        ("database", &report.database),
        ("llm", &report.llm),
        ("calendar", &report.calendar),
    ] {
        lines.push(format!("[{}] {name}: {}", check.status, check.detail));
    }
    CommandResult::raw(exit_code, lines.join("\n"))
}
