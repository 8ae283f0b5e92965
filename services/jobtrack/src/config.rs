//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password comes from JOBTRACK_PASSWORD or password_file and is
//! never stored in the TOML directly.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "jobtrack.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Job-tracker API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Local session storage and refresh behaviour
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Refresh the access token shortly before it expires
    #[serde(default)]
    pub proactive_refresh: bool,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: u64,
    /// Path to a file containing the login password (alternative to JOBTRACK_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Write Prometheus text exposition to stderr when a command finishes
    #[serde(default)]
    pub print_metrics: bool,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("jobtrack-session.json")
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_refresh_threshold() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            proactive_refresh: false,
            refresh_interval_secs: default_refresh_interval(),
            refresh_threshold_secs: default_refresh_threshold(),
            password_file: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)?;
                config.finish()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default().finish(),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply env overrides, resolve the password, and validate.
    ///
    /// Password resolution order:
    /// 1. JOBTRACK_PASSWORD env var
    /// 2. password_file path from config
    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("JOBTRACK_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(password) = std::env::var("JOBTRACK_PASSWORD") {
            self.session.password = Secret::from_trimmed(&password);
        } else if let Some(ref password_file) = self.session.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            self.session.password = Secret::from_trimmed(&password);
        }

        self.validate()?;
        Ok(self)
    }

    /// Apply a `--api-url` flag on top of everything else.
    pub fn override_base_url(&mut self, url: Option<&str>) -> common::Result<()> {
        if let Some(url) = url {
            self.api.base_url = url.to_string();
            self.validate()?;
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(common::Error::InvalidValue {
                field: "api.base_url",
                reason: format!(
                    "must start with http:// or https://, got: {}",
                    self.api.base_url
                ),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::InvalidValue {
                field: "api.timeout_secs",
                reason: "must be greater than 0".into(),
            });
        }
        if self.session.refresh_interval_secs == 0 {
            return Err(common::Error::InvalidValue {
                field: "session.refresh_interval_secs",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.session.refresh_interval_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.session.refresh_threshold_secs)
    }

    /// Resolve config file path from CLI arg or JOBTRACK_CONFIG env var.
    ///
    /// The flag reports whether the path was chosen explicitly; only then is
    /// a missing file an error.
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("JOBTRACK_CONFIG") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_PATH), false)
    }
}
