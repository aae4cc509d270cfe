//! Configuration for the keywatch daemon.
//!
//! Read from a TOML file, by default `~/.config/keywatch/config.toml`. The
//! `KEYWATCH_CONFIG` environment variable points at another file. A missing
//! file is not an error; every setting has a default except the project to
//! watch, which may also come from the command line.
//!
//! ```toml
//! [release]
//! owner = "octo"
//! project = "widget"
//! success_interval_secs = 3600
//! failure_interval_secs = 60
//!
//! [logging]
//! filter = "keywatchd=debug"
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::release::{
    PollIntervals, ReleaseLocator, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT,
    FAILURE_INTERVAL, SUCCESS_INTERVAL,
};
use crate::MonitorError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "KEYWATCH_CONFIG";

/// Default log filter when neither `RUST_LOG` nor the file sets one.
pub const DEFAULT_LOG_FILTER: &str = "keywatchd=info,keywatch=info";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value is out of range
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Full daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub release: ReleaseSettings,
    pub logging: LoggingSettings,
}

/// `[release]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSettings {
    pub owner: Option<String>,
    pub project: Option<String>,
    pub api_base: String,
    pub success_interval_secs: u64,
    pub failure_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            owner: None,
            project: None,
            api_base: DEFAULT_API_BASE.to_string(),
            success_interval_secs: SUCCESS_INTERVAL.as_secs(),
            failure_interval_secs: FAILURE_INTERVAL.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ReleaseSettings {
    /// Polling intervals as durations.
    pub fn intervals(&self) -> PollIntervals {
        PollIntervals::new(
            Duration::from_secs(self.success_interval_secs),
            Duration::from_secs(self.failure_interval_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the locator for the configured project.
    ///
    /// # Errors
    ///
    /// `MonitorError::InvalidLocator` if owner or project is missing or
    /// malformed.
    pub fn locator(&self) -> Result<ReleaseLocator, MonitorError> {
        let owner = self.owner.as_deref().ok_or_else(|| not_configured("owner"))?;
        let project = self.project.as_deref().ok_or_else(|| not_configured("project"))?;
        Ok(ReleaseLocator::new(owner, project)?.with_api_base(self.api_base.as_str()))
    }
}

fn not_configured(field: &'static str) -> MonitorError {
    MonitorError::InvalidLocator {
        field,
        reason: "not configured".to_string(),
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins over this
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// Uses `path` if given, else `KEYWATCH_CONFIG`, else the default
    /// location. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(default_config_path)
        {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads `path`, returning defaults if it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let release = &self.release;
        for (field, value) in [
            ("release.success_interval_secs", release.success_interval_secs),
            ("release.failure_interval_secs", release.failure_interval_secs),
            ("release.request_timeout_secs", release.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if release.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "release.user_agent",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keywatch").join("config.toml"))
}
