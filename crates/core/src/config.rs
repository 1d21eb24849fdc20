use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Effective application configuration. Layering order: built-in defaults,
/// then `bookline.toml` (with `${ENV}` interpolation), then `BOOKLINE_*`
/// environment variables, then programmatic overrides, then validation.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub calendar: CalendarConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    /// Used when a business record carries no calendar id of its own.
    pub default_calendar_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub slot_minutes: u32,
    pub lookahead_days: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub calendar_base_url: Option<String>,
    pub calendar_api_key: Option<String>,
    pub default_calendar_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bookline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                enabled: false,
                base_url: "http://localhost:11434/v1/completions".to_string(),
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 12,
                max_tokens: 200,
                temperature: 0.4,
            },
            calendar: CalendarConfig {
                base_url: None,
                api_key: None,
                timeout_secs: 10,
                default_calendar_id: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            session: SessionConfig { ttl_secs: 2 * 60 * 60, slot_minutes: 30, lookahead_days: 7 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bookline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(base_url) = calendar.base_url {
                self.calendar.base_url = Some(base_url);
            }
            if let Some(api_key) = calendar.api_key {
                self.calendar.api_key = Some(api_key.into());
            }
            if let Some(timeout_secs) = calendar.timeout_secs {
                self.calendar.timeout_secs = timeout_secs;
            }
            if let Some(default_calendar_id) = calendar.default_calendar_id {
                self.calendar.default_calendar_id = Some(default_calendar_id);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(session) = patch.session {
            if let Some(ttl_secs) = session.ttl_secs {
                self.session.ttl_secs = ttl_secs;
            }
            if let Some(slot_minutes) = session.slot_minutes {
                self.session.slot_minutes = slot_minutes;
            }
            if let Some(lookahead_days) = session.lookahead_days {
                self.session.lookahead_days = lookahead_days;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOOKLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BOOKLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("BOOKLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BOOKLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_LLM_ENABLED") {
            self.llm.enabled = parse_bool("BOOKLINE_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("BOOKLINE_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("BOOKLINE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("BOOKLINE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("BOOKLINE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_CALENDAR_BASE_URL") {
            self.calendar.base_url = Some(value);
        }
        if let Some(value) = read_env("BOOKLINE_CALENDAR_API_KEY") {
            self.calendar.api_key = Some(value.into());
        }
        if let Some(value) = read_env("BOOKLINE_CALENDAR_TIMEOUT_SECS") {
            self.calendar.timeout_secs = parse_u64("BOOKLINE_CALENDAR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_DEFAULT_CALENDAR_ID") {
            self.calendar.default_calendar_id = Some(value);
        }

        if let Some(value) = read_env("BOOKLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BOOKLINE_SERVER_PORT") {
            self.server.port = parse_u16("BOOKLINE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("BOOKLINE_SESSION_TTL_SECS") {
            self.session.ttl_secs = parse_u64("BOOKLINE_SESSION_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKLINE_SESSION_SLOT_MINUTES") {
            self.session.slot_minutes = parse_u32("BOOKLINE_SESSION_SLOT_MINUTES", &value)?;
        }

        let log_level =
            read_env("BOOKLINE_LOGGING_LEVEL").or_else(|| read_env("BOOKLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOOKLINE_LOGGING_FORMAT").or_else(|| read_env("BOOKLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(base_url) = overrides.calendar_base_url {
            self.calendar.base_url = Some(base_url);
        }
        if let Some(api_key) = overrides.calendar_api_key {
            self.calendar.api_key = Some(api_key.into());
        }
        if let Some(default_calendar_id) = overrides.default_calendar_id {
            self.calendar.default_calendar_id = Some(default_calendar_id);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        let sqlite_url =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !sqlite_url {
            return Err(ConfigError::Validation(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                    .to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }
        if self.database.timeout_secs == 0 || self.database.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "database.timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        if self.llm.enabled && self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.base_url is required when llm.enabled is true".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 || self.llm.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        if let Some(base_url) = &self.calendar.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::Validation(
                    "calendar.base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        if self.calendar.timeout_secs == 0 || self.calendar.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "calendar.timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be greater than zero".to_string(),
            ));
        }

        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "session.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.session.slot_minutes == 0 || self.session.slot_minutes > 24 * 60 {
            return Err(ConfigError::Validation(
                "session.slot_minutes must be in range 1..=1440".to_string(),
            ));
        }
        if self.session.lookahead_days == 0 || self.session.lookahead_days > 90 {
            return Err(ConfigError::Validation(
                "session.lookahead_days must be in range 1..=90".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }

    /// True when an external calendar client can actually be built.
    pub fn calendar_configured(&self) -> bool {
        self.calendar
            .base_url
            .as_ref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn calendar_api_key(&self) -> Option<&str> {
        self.calendar.api_key.as_ref().map(|key| key.expose_secret())
    }

    pub fn llm_api_key(&self) -> Option<&str> {
        self.llm.api_key.as_ref().map(|key| key.expose_secret())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bookline.toml"), PathBuf::from("config/bookline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    calendar: Option<CalendarPatch>,
    server: Option<ServerPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    default_calendar_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    ttl_secs: Option<u64>,
    slot_minutes: Option<u32>,
    lookahead_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_validate_and_disable_external_collaborators() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert!(!config.llm.enabled);
        assert!(!config.calendar_configured());
        assert_eq!(config.session.ttl_secs, 7200);
        assert!(matches!(config.logging.format, LogFormat::Compact));
    }

    #[test]
    fn file_patch_supports_env_interpolation() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("TEST_BOOKLINE_CAL_KEY", "cal-key-from-env");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bookline.toml");
        fs::write(
            &path,
            r#"
[calendar]
base_url = "https://calendar.example.com"
api_key = "${TEST_BOOKLINE_CAL_KEY}"
"#,
        )
        .expect("write config");

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect("config load");

        assert!(config.calendar_configured());
        assert_eq!(
            config.calendar.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("cal-key-from-env".to_string())
        );

        clear_vars(&["TEST_BOOKLINE_CAL_KEY"]);
    }

    #[test]
    fn precedence_is_defaults_file_env_overrides() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("BOOKLINE_DATABASE_URL", "sqlite://from-env.db");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bookline.toml");
        fs::write(
            &path,
            r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config load");

        // Env beats file; overrides beat env.
        assert_eq!(config.database.url, "sqlite://from-env.db");
        assert_eq!(config.logging.level, "debug");

        clear_vars(&["BOOKLINE_DATABASE_URL"]);
    }

    #[test]
    fn validation_rejects_non_sqlite_urls() {
        let _guard = env_lock().lock().expect("env lock");
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://nope".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect_err("must fail validation");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("database.url")
        ));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");
        let error = AppConfig::load(LoadOptions {
            config_path: Some("definitely-not-here.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("must fail");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn secrets_are_not_leaked_by_debug_output() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("BOOKLINE_LLM_API_KEY", "llm-secret-value");

        let config = AppConfig::load(LoadOptions::default()).expect("config load");
        let debug = format!("{config:?}");
        assert!(!debug.contains("llm-secret-value"));

        clear_vars(&["BOOKLINE_LLM_API_KEY"]);
    }
}
