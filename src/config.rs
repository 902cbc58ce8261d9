use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORAGE: &str = "local";
const CONFIG_DIR: &str = "config";
const DEFAULT_ADVISOR_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_RETENTION_SWEEP_SECS: u64 = 6 * 60 * 60;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Record storage backing: "local" or "sql"
    #[serde(default = "default_storage")]
    #[validate(custom = "validate_storage")]
    pub storage: String,

    /// JSON snapshot file for the local backing; in-memory only when unset
    #[serde(default)]
    pub local_data_path: Option<PathBuf>,

    /// Database URL for the sql backing; may be empty when supplied by the
    /// environment or an override file
    #[serde(default)]
    pub database_url: String,

    /// Override file consulted after the static URL and the environment
    #[serde(default)]
    pub backend_override_path: Option<PathBuf>,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Change feed capacity
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// API key for the maintenance advisor; advisor endpoints answer with a
    /// fallback message when unset
    #[serde(default)]
    pub advisor_api_key: Option<String>,

    #[serde(default = "default_advisor_model")]
    pub advisor_model: String,

    /// Seconds between photo retention sweeps
    #[serde(default = "default_retention_sweep_interval_secs")]
    #[validate(range(min = 1))]
    pub retention_sweep_interval_secs: u64,
}

impl AppConfig {
    /// Configuration for a development server with the in-memory local backing.
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            storage: default_storage(),
            local_data_path: None,
            database_url: String::new(),
            backend_override_path: None,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            advisor_api_key: None,
            advisor_model: default_advisor_model(),
            retention_sweep_interval_secs: default_retention_sweep_interval_secs(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn uses_sql_storage(&self) -> bool {
        self.storage.eq_ignore_ascii_case("sql")
    }

    /// Providers consulted, in order, to locate the sql backing.
    pub fn backend_providers(&self) -> Vec<Box<dyn BackendConfigProvider>> {
        let mut providers: Vec<Box<dyn BackendConfigProvider>> = vec![
            Box::new(StaticProvider::new(self.database_url.clone(), None)),
            Box::new(EnvProvider::default()),
        ];
        if let Some(path) = &self.backend_override_path {
            providers.push(Box::new(FileProvider::new(path.clone())));
        }
        providers
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid backend override: {0}")]
    Override(#[from] serde_json::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_storage() -> String {
    DEFAULT_STORAGE.to_string()
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_advisor_model() -> String {
    DEFAULT_ADVISOR_MODEL.to_string()
}

fn default_retention_sweep_interval_secs() -> u64 {
    DEFAULT_RETENTION_SWEEP_SECS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some(format!("log_level must be one of {:?}", valid_levels).into());
        Err(err)
    }
}

fn validate_storage(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "local" | "sql" => Ok(()),
        _ => {
            let mut err = ValidationError::new("storage");
            err.message = Some("storage must be either 'local' or 'sql'".into());
            Err(err)
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("lubetrack_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("storage", DEFAULT_STORAGE)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

// ---------------------------------------------------------------------------
// Backend location
// ---------------------------------------------------------------------------

pub const BACKEND_URL_VAR: &str = "LUBETRACK_BACKEND_URL";
pub const BACKEND_KEY_VAR: &str = "LUBETRACK_BACKEND_KEY";

/// Where the remote (sql) backing lives and the credential used to reach it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub key: Option<String>,
}

impl BackendConfig {
    /// Builds a config from raw values, rejecting blank and "undefined" urls.
    pub fn from_parts(url: Option<String>, key: Option<String>) -> Option<Self> {
        let url = usable(url)?;
        Some(Self {
            url,
            key: usable(key),
        })
    }

    /// Database URL with the key filled in as password when the URL has none.
    pub fn connection_url(&self) -> String {
        let Some(key) = &self.key else {
            return self.url.clone();
        };
        match reqwest::Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_none() && !parsed.username().is_empty() => {
                if parsed.set_password(Some(key)).is_ok() {
                    parsed.to_string()
                } else {
                    self.url.clone()
                }
            }
            _ => self.url.clone(),
        }
    }
}

fn usable(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "undefined")
}

/// One source of backend location, consulted in priority order.
pub trait BackendConfigProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// A complete config, or `None` to fall through to the next provider.
    fn provide(&self) -> Option<BackendConfig>;
}

/// Value fixed at build or deploy time.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    url: String,
    key: Option<String>,
}

impl StaticProvider {
    pub fn new(url: impl Into<String>, key: Option<String>) -> Self {
        Self {
            url: url.into(),
            key,
        }
    }
}

impl BackendConfigProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn provide(&self) -> Option<BackendConfig> {
        BackendConfig::from_parts(Some(self.url.clone()), self.key.clone())
    }
}

#[derive(Debug, Clone)]
pub struct EnvProvider {
    url_var: String,
    key_var: String,
}

impl EnvProvider {
    pub fn new(url_var: impl Into<String>, key_var: impl Into<String>) -> Self {
        Self {
            url_var: url_var.into(),
            key_var: key_var.into(),
        }
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new(BACKEND_URL_VAR, BACKEND_KEY_VAR)
    }
}

impl BackendConfigProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn provide(&self) -> Option<BackendConfig> {
        BackendConfig::from_parts(env::var(&self.url_var).ok(), env::var(&self.key_var).ok())
    }
}

/// Local override file, written by [`FileProvider::save_override`].
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_override(&self, config: &BackendConfig) -> Result<(), AppConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(config)?;
        std::fs::write(&self.path, body)?;
        info!(path = %self.path.display(), "backend override saved");
        Ok(())
    }

    pub fn clear_override(&self) -> Result<(), AppConfigError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl BackendConfigProvider for FileProvider {
    fn name(&self) -> &'static str {
        "override-file"
    }

    fn provide(&self) -> Option<BackendConfig> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no backend override");
                return None;
            }
        };
        match serde_json::from_slice::<BackendConfig>(&raw) {
            Ok(stored) => BackendConfig::from_parts(Some(stored.url), stored.key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable backend override");
                None
            }
        }
    }
}

/// Returns the first complete config offered by `providers`.
pub fn resolve_backend(providers: &[Box<dyn BackendConfigProvider>]) -> Option<BackendConfig> {
    providers.iter().find_map(|provider| {
        let found = provider.provide();
        if found.is_some() {
            info!(provider = provider.name(), "backend location resolved");
        }
        found
    })
}
