//! # Handler Configuration
//!
//! Settings consumed by the pipeline. Defaults work without any file or
//! environment; `from_env` and `from_file` layer overrides on top of them.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error_log::DEFAULT_CAPACITY;
use crate::patterns::PatternConfig;
use crate::types::{Error, ErrorKind};

/// Prefix of the environment variables read by `from_env`
pub const ENV_PREFIX: &str = "ERROR_FEEDBACK";

pub const DEFAULT_SUPPORT_EMAIL: &str = "support@example.com";
pub const DEFAULT_STATUS_PAGE_URL: &str = "https://status.example.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::new(ErrorKind::Configuration, err.to_string()).cause(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::from(err).into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Directory for daily error logs and exports; no durable sink when unset
    pub log_dir: Option<PathBuf>,
    /// Maximum number of records kept in memory
    pub max_log_size: usize,
    /// Deployment environment. Technical details are shown only when this is
    /// set to something other than `production`.
    pub environment: Option<String>,
    pub support_email: String,
    pub status_page_url: String,
    pub pattern_window_secs: u64,
    pub pattern_frequency_threshold: usize,
    pub pattern_component_sample: usize,
    pub pattern_component_threshold: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            max_log_size: DEFAULT_CAPACITY,
            environment: None,
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            status_page_url: DEFAULT_STATUS_PAGE_URL.to_string(),
            pattern_window_secs: 300,
            pattern_frequency_threshold: 5,
            pattern_component_sample: 10,
            pattern_component_threshold: 3,
        }
    }
}

impl HandlerConfig {
    /// Loads `.env` if present, then `ERROR_FEEDBACK_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::try_from(cfg)?.validated()
    }

    /// Loads a TOML, YAML or JSON file, with environment variables on top
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::try_from(cfg)?.validated()
    }

    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn max_log_size(mut self, size: usize) -> Self {
        self.max_log_size = size;
        self
    }

    pub fn environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// True unless a non-production environment was set explicitly
    pub fn is_production(&self) -> bool {
        self.environment
            .as_deref()
            .map_or(true, |env| env.eq_ignore_ascii_case("production"))
    }

    pub fn pattern_config(&self) -> PatternConfig {
        PatternConfig {
            frequency_window: Duration::seconds(self.pattern_window_secs as i64),
            frequency_threshold: self.pattern_frequency_threshold,
            component_sample: self.pattern_component_sample,
            component_threshold: self.pattern_component_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_log_size == 0 {
            return Err(ConfigError::InvalidValue("max_log_size must be greater than zero".into()));
        }
        if self.pattern_window_secs == 0 || self.pattern_window_secs > i64::MAX as u64 / 1000 {
            return Err(ConfigError::InvalidValue(format!(
                "pattern_window_secs out of range: {}",
                self.pattern_window_secs
            )));
        }
        if self.pattern_frequency_threshold == 0
            || self.pattern_component_sample == 0
            || self.pattern_component_threshold == 0
        {
            return Err(ConfigError::InvalidValue("pattern thresholds must be greater than zero".into()));
        }
        Ok(())
    }

    fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

impl TryFrom<config::Config> for HandlerConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        // Start from defaults and selectively override from the provided config.
        let mut base = HandlerConfig::default();

        if let Ok(log_dir) = cfg.get::<String>("log_dir") {
            base.log_dir = Some(PathBuf::from(log_dir));
        }
        if let Ok(max_log_size) = cfg.get::<usize>("max_log_size") {
            base.max_log_size = max_log_size;
        }
        if let Ok(environment) = cfg.get::<String>("environment") {
            base.environment = Some(environment);
        }
        if let Ok(email) = cfg.get::<String>("support_email") {
            base.support_email = email;
        }
        if let Ok(url) = cfg.get::<String>("status_page_url") {
            base.status_page_url = url;
        }
        if let Ok(secs) = cfg.get::<u64>("pattern_window_secs") {
            base.pattern_window_secs = secs;
        }
        if let Ok(threshold) = cfg.get::<usize>("pattern_frequency_threshold") {
            base.pattern_frequency_threshold = threshold;
        }
        if let Ok(sample) = cfg.get::<usize>("pattern_component_sample") {
            base.pattern_component_sample = sample;
        }
        if let Ok(threshold) = cfg.get::<usize>("pattern_component_threshold") {
            base.pattern_component_threshold = threshold;
        }

        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = HandlerConfig::default();
        assert!(cfg.log_dir.is_none());
        assert_eq!(cfg.max_log_size, 1000);
        assert!(cfg.environment.is_none());
        assert!(cfg.is_production());
        assert_eq!(cfg.pattern_config(), PatternConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
environment = "production"
max_log_size = 50
support_email = "help@acme.test"
log_dir = "/var/log/acme"
"#
        )
        .unwrap();

        let cfg = HandlerConfig::from_file(file.path()).unwrap();

        assert!(cfg.is_production());
        assert_eq!(cfg.max_log_size, 50);
        assert_eq!(cfg.support_email, "help@acme.test");
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/acme")));
        assert_eq!(cfg.status_page_url, DEFAULT_STATUS_PAGE_URL);
    }

    #[test]
    fn test_only_explicit_non_production_environment() {
        assert!(HandlerConfig::default().environment("PRODUCTION").is_production());
        assert!(!HandlerConfig::default().environment("development").is_production());
        assert!(!HandlerConfig::default().environment("staging").is_production());
    }

    #[test]
    fn test_config_crate_error_converts_directly() {
        fn load(path: &Path) -> crate::types::Result<config::Config> {
            Ok(config::Config::builder()
                .add_source(config::File::from(path))
                .build()?)
        }

        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let cfg = HandlerConfig::default().max_log_size(0);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
