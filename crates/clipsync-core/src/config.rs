// Configuration loading and parsing (clipsync.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name of the single configuration file under `config/`.
pub const CONFIG_FILE_NAME: &str = "clipsync.toml";

/// Upper bound for `session.max_age_secs` (400 days).
pub const MAX_COOKIE_AGE_SECS: i64 = 400 * 86_400;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub reporter: ReporterConfig,
    pub database: DatabaseConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where the companion server lives and which endpoints it exposes.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP origin, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Full WebSocket URL of the session channel.
    pub ws_url: String,
    #[serde(default = "default_playlist_path")]
    pub playlist_path: String,
    #[serde(default = "default_control_path")]
    pub control_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Absolute URL of the playlist endpoint.
    pub fn playlist_url(&self) -> String {
        join_url(&self.base_url, &self.playlist_path)
    }

    /// Absolute URL of the transport control endpoint.
    pub fn control_url(&self) -> String {
        join_url(&self.base_url, &self.control_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: default_cookie_name(),
            cookie_path: default_cookie_path(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Backoff policy for the session channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound on consecutive attempts. `0` retries forever.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            enabled: true,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Whether attempt number `attempt` is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }
}

/// What to do with a selection that is missing from a refreshed playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleSelection {
    /// Leave the selection alone.
    #[default]
    Keep,
    /// Move the selection to the first item of the new playlist.
    ResetToFirst,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub on_stale: StaleSelection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    pub queue_capacity: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig { queue_capacity: 64 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

fn default_playlist_path() -> String {
    "/videos".into()
}

fn default_control_path() -> String {
    "/audio-control".into()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_cookie_name() -> String {
    "session_id".into()
}

fn default_cookie_path() -> String {
    "/".into()
}

fn default_max_age_secs() -> i64 {
    86_400
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/clipsync.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Parse a configuration document without touching the filesystem.
pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Copy `defaults/clipsync.toml` to `config/clipsync.toml` if the latter is
/// missing. Returns the path written, or `None` when the config already existed.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE_NAME);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE_NAME} or defaults/{CONFIG_FILE_NAME} in {}; \
                 run from the project root",
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy_err)?;
    std::fs::copy(&source, &target).map_err(copy_err)?;

    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Copies the shipped defaults on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;
    if !(server.base_url.starts_with("http://") || server.base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: format!("must start with http:// or https://, got {:?}", server.base_url),
        });
    }

    if !(server.ws_url.starts_with("ws://") || server.ws_url.starts_with("wss://")) {
        return Err(ConfigError::ValidationError {
            field: "server.ws_url".into(),
            message: format!("must start with ws:// or wss://, got {:?}", server.ws_url),
        });
    }

    if server.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.request_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let session = &config.session;
    if session.cookie_name.is_empty()
        || session
            .cookie_name
            .chars()
            .any(|c| c == '=' || c == ';' || c.is_whitespace())
    {
        return Err(ConfigError::ValidationError {
            field: "session.cookie_name".into(),
            message: format!("not a valid cookie name: {:?}", session.cookie_name),
        });
    }

    if !session.cookie_path.starts_with('/') {
        return Err(ConfigError::ValidationError {
            field: "session.cookie_path".into(),
            message: "must start with '/'".into(),
        });
    }

    if session.max_age_secs <= 0 || session.max_age_secs > MAX_COOKIE_AGE_SECS {
        return Err(ConfigError::ValidationError {
            field: "session.max_age_secs".into(),
            message: format!(
                "must be in 1..={MAX_COOKIE_AGE_SECS}, got {}",
                session.max_age_secs
            ),
        });
    }

    let reconnect = &config.reconnect;
    if reconnect.base_delay_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "reconnect.base_delay_ms".into(),
            message: "must be > 0".into(),
        });
    }
    if reconnect.max_delay_ms < reconnect.base_delay_ms {
        return Err(ConfigError::ValidationError {
            field: "reconnect.max_delay_ms".into(),
            message: format!(
                "must be >= reconnect.base_delay_ms ({}), got {}",
                reconnect.base_delay_ms, reconnect.max_delay_ms
            ),
        });
    }

    if config.reporter.queue_capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "reporter.queue_capacity".into(),
            message: "must be > 0".into(),
        });
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
