//! Server configuration module.
//!
//! Parses configuration from environment variables for the Todos server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 4567 | HTTP server port |
//! | `TODOS_SESSION_TTL_SECS` | No | 86400 | Idle lifetime of a session, at most one year |
//! | `TODOS_MAX_SESSIONS` | No | 10000 | Maximum number of live sessions |
//! | `TODOS_SECURE_COOKIE` | No | false | Mark the session cookie `Secure` |

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::session::{SessionStoreConfig, DEFAULT_MAX_CAPACITY, DEFAULT_TTL_SECS, MAX_TTL_SECS};

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 4567;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// How long an untouched session is kept.
    pub session_ttl: Duration,

    /// Maximum number of sessions held at once.
    pub max_sessions: usize,

    /// When true, the session cookie is only sent over HTTPS.
    pub secure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_sessions: DEFAULT_MAX_CAPACITY,
            secure_cookie: false,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Port number is not a valid u16
    /// - A numeric variable is not a number
    /// - The session TTL or session capacity is zero
    /// - The session TTL is longer than one year
    ///
    /// # Example
    ///
    /// ```no_run
    /// use todos_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            port: parse_port()?,
            session_ttl: Duration::from_secs(parse_number_env(
                "TODOS_SESSION_TTL_SECS",
                DEFAULT_TTL_SECS,
            )?),
            max_sessions: parse_number_env("TODOS_MAX_SESSIONS", DEFAULT_MAX_CAPACITY)?,
            secure_cookie: parse_bool_env("TODOS_SECURE_COOKIE"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Settings for the session store derived from this configuration.
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::new(self.max_sessions, self.session_ttl)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "TODOS_SESSION_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.session_ttl > Duration::from_secs(MAX_TTL_SECS) {
            return Err(ConfigError::ValidationError(format!(
                "TODOS_SESSION_TTL_SECS must be at most {MAX_TTL_SECS}"
            )));
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "TODOS_MAX_SESSIONS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse an unsigned numeric environment variable, falling back to
/// `default` when it is unset or blank.
fn parse_number_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(default),
        Ok(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::InvalidFormat {
            var: name.to_string(),
            message: err.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}
