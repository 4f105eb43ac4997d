//! TOML configuration for adfreport.
//!
//! Every section has compiled-in defaults; the file only needs to name what
//! differs. Secrets are never read from the file, only the names of the
//! environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ADFREPORT_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const LOCAL_CONFIG: &str = "adfreport.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub factory: FactoryConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), scenarios = config.scenarios.len(), "loaded configuration");
        Ok(config)
    }

    /// Try, in order: `ADFREPORT_CONFIG`, `./adfreport.toml`, then defaults.
    ///
    /// A file that is named or present but cannot be loaded is an error;
    /// defaults apply only when there is no file at all.
    pub fn load_or_default() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::discover(explicit.as_deref(), Path::new(LOCAL_CONFIG))
    }

    fn discover(explicit: Option<&Path>, local: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).with_context(|| format!("{CONFIG_ENV} points at an unusable file"));
        }

        if local.exists() {
            return Self::load(local);
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Which data factory to query, and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
    pub tenant_id: String,
    pub client_id: String,
    /// Environment variable holding the service principal secret.
    pub client_secret_env: String,
    pub management_url: String,
    pub login_url: String,
    pub api_version: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            resource_group: String::new(),
            factory_name: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret_env: "ADFREPORT_CLIENT_SECRET".to_string(),
            management_url: "https://management.azure.com".to_string(),
            login_url: "https://login.microsoftonline.com".to_string(),
            api_version: "2018-06-01".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// IANA timezone the cutoff hour is expressed in.
    pub timezone: String,
    pub cutoff_hour: u32,
    pub lookback_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/London".to_string(),
            cutoff_hour: 14,
            lookback_days: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded retry for the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Per-request timeout; expiry counts as a retryable failure.
    pub request_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
            request_timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Mail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    /// Default recipients when none are given on the command line.
    pub recipients: Vec<String>,
    /// Environment variable holding the SendGrid API key.
    pub api_key_env: String,
    pub endpoint: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@something.com".to_string(),
            recipients: Vec::new(),
            api_key_env: "SENDGRID_API_KEY".to_string(),
            endpoint: "https://api.sendgrid.com/v3/mail/send".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Hours added to UTC activity timestamps before display.
    pub display_offset_hours: i64,
    /// Placeholder rows appended when extra rows are requested.
    pub extra_rows: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            display_offset_hours: 1,
            extra_rows: vec!["Model Refresh".to_string(), "Post Validation".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// A monitored pipeline and the activities shown for it, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub pipeline: String,
    #[serde(default)]
    pub activities: Vec<ActivityDisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDisplayConfig {
    /// Activity name as the factory reports it.
    pub name: String,
    /// Row label in the report; defaults to `name`.
    #[serde(default)]
    pub display: Option<String>,
}
