//! Client configuration: credentials and poll settings, loadable from the environment.

use crate::AssemblyError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TRANSIENT_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(String),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
    #[error("http client: {0}")]
    Client(String),
}

/// Account key/secret pair. The secret is only used to sign requests.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Read `TRANSLOADIT_KEY` and `TRANSLOADIT_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required_env("TRANSLOADIT_KEY")?,
            required_env("TRANSLOADIT_SECRET")?,
        ))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// How the status poller waits for a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between status fetches.
    pub interval: Duration,
    /// Give up once this much time has passed since the wait began.
    pub timeout: Duration,
    /// Consecutive transient fetch failures tolerated before the error surfaces.
    pub max_transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            max_transient_retries: DEFAULT_TRANSIENT_RETRIES,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_transient_retries: u32) -> Self {
        self.max_transient_retries = max_transient_retries;
        self
    }

    /// Read `TRANSLOADIT_POLL_INTERVAL_MS`, `TRANSLOADIT_POLL_TIMEOUT_SECS` and
    /// `TRANSLOADIT_POLL_RETRIES`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let interval_ms = env_or(
            "TRANSLOADIT_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL.as_millis() as u64,
        )?;
        let timeout_secs =
            env_or("TRANSLOADIT_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT.as_secs())?;
        let retries = env_or("TRANSLOADIT_POLL_RETRIES", DEFAULT_TRANSIENT_RETRIES)?;
        let config = Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_secs(timeout_secs),
        )
        .with_retries(retries);
        config.validate().map_err(|e| ConfigError::Invalid {
            var: "TRANSLOADIT_POLL_*".to_string(),
            value: e.to_string(),
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AssemblyError> {
        if self.interval.is_zero() {
            return Err(AssemblyError::Validation(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AssemblyError::Validation(
                "poll timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn required_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

/// Parse an optional environment variable, using `default` when it is unset.
pub fn env_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    parse_or(var, std::env::var(var).ok(), default)
}

fn parse_or<T: FromStr>(var: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value,
        }),
    }
}
