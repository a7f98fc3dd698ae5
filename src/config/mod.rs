//! Configuration loading and validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::fetch::{FetcherConfig, RetryPolicy, DEFAULT_ACCEPT, DEFAULT_ENDPOINT};

/// Largest accepted value for any delay, backoff or jitter setting (one day).
const MAX_DURATION_SECONDS: f64 = 86_400.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("{0} environment variable not set")]
    MissingCredential(String),
}

/// Analytics API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Pause before each request, in seconds
    #[serde(default = "default_request_delay")]
    pub request_delay_seconds: f64,

    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_token_env() -> String {
    "PAGERDUTY_API_TOKEN".to_string()
}

fn default_user_agent() -> String {
    format!("mtta-updater/{}", env!("CARGO_PKG_VERSION"))
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_request_delay() -> f64 {
    2.5
}

fn default_verify_tls() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            timeout_seconds: default_timeout(),
            request_delay_seconds: default_request_delay(),
            verify_tls: default_verify_tls(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_seconds: f64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: f64,

    #[serde(default = "default_max_jitter")]
    pub max_jitter_seconds: f64,
}

fn default_max_attempts() -> u32 {
    7
}

fn default_initial_backoff() -> f64 {
    3.0
}

fn default_max_backoff() -> f64 {
    120.0
}

fn default_max_jitter() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_seconds: default_initial_backoff(),
            max_backoff_seconds: default_max_backoff(),
            max_jitter_seconds: default_max_jitter(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_secs_f64(self.initial_backoff_seconds),
            max_backoff: Duration::from_secs_f64(self.max_backoff_seconds),
            max_jitter: Duration::from_secs_f64(self.max_jitter_seconds),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workbook to update in place
    #[serde(default = "default_workbook")]
    pub workbook: PathBuf,

    /// Worksheet name (first sheet when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_workbook() -> PathBuf {
    PathBuf::from("./MTTA_calc.xlsx")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            sheet: None,
            log_level: default_log_level(),
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        let durations = [
            ("request_delay_seconds", self.api.request_delay_seconds),
            ("initial_backoff_seconds", self.retry.initial_backoff_seconds),
            ("max_backoff_seconds", self.retry.max_backoff_seconds),
            ("max_jitter_seconds", self.retry.max_jitter_seconds),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
            if value > MAX_DURATION_SECONDS {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at most {} seconds, got {}",
                    name, MAX_DURATION_SECONDS, value
                )));
            }
        }

        Url::parse(&self.api.endpoint).map_err(|e| {
            ConfigError::ValidationError(format!("invalid endpoint '{}': {}", self.api.endpoint, e))
        })?;

        Ok(())
    }

    /// Fetcher settings derived from this configuration.
    pub fn fetcher_config(&self, simulate: bool) -> FetcherConfig {
        FetcherConfig {
            endpoint: self.api.endpoint.clone(),
            timeout: Duration::from_secs(self.api.timeout_seconds),
            user_agent: self.api.user_agent.clone(),
            accept: self.api.accept.clone(),
            request_delay: Duration::from_secs_f64(self.api.request_delay_seconds),
            verify_tls: self.api.verify_tls,
            simulate,
            retry: self.retry.to_policy(),
        }
    }
}

/// API token for the analytics provider. Never printed in full.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self(token.trim().to_string())),
            _ => Err(ConfigError::MissingCredential(var.to_string())),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Token token={}", self.0)
    }

    /// First four characters, for log lines.
    pub fn prefix(&self) -> String {
        self.0.chars().take(4).collect()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken({}...)", self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.workbook, PathBuf::from("./MTTA_calc.xlsx"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.api.token_env, "PAGERDUTY_API_TOKEN");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.retry.max_attempts, 7);
    }

    #[test]
    fn test_retry_config_to_policy() {
        let policy = RetryConfig::default().to_policy();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.api.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_negative_delay() {
        let mut config = AppConfig::default();
        config.api.request_delay_seconds = -1.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_huge_durations() {
        let mut config = AppConfig::default();
        config.api.request_delay_seconds = 1e20;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.retry.max_backoff_seconds = 86_401.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry.max_backoff_seconds = 86_400.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_endpoint() {
        let mut config = AppConfig::default();
        config.api.endpoint = "::nope".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            workbook = "/tmp/book.xlsx"

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.workbook, PathBuf::from("/tmp/book.xlsx"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_backoff_seconds, 120.0);
        assert_eq!(config.api.request_delay_seconds, 2.5);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.retry.max_attempts, 7);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mtta.toml");
        std::fs::write(&path, "[api]\ntimeout_seconds = 0\n").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_fetcher_config() {
        let config = AppConfig::default();
        let fetcher = config.fetcher_config(true);

        assert!(fetcher.simulate);
        assert_eq!(fetcher.timeout, Duration::from_secs(30));
        assert_eq!(fetcher.request_delay, Duration::from_millis(2500));
        assert_eq!(fetcher.retry.max_attempts, 7);
    }

    #[test]
    fn test_token_redaction() {
        let token = ApiToken::new("abcdefgh12345");

        assert_eq!(token.prefix(), "abcd");
        assert_eq!(token.authorization(), "Token token=abcdefgh12345");
        assert_eq!(format!("{:?}", token), "ApiToken(abcd...)");
    }

    #[test]
    fn test_token_from_env_missing() {
        let err = ApiToken::from_env("MTTA_UPDATER_TEST_TOKEN_THAT_IS_NOT_SET").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.workbook, parsed.workbook);
        assert_eq!(config.api.endpoint, parsed.api.endpoint);
    }
}
