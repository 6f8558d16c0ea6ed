use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlMultiplexError;

/// Smallest pool the multiplexer will build.
pub const MIN_POOL_SIZE: usize = 1;
/// Largest pool the multiplexer will build.
pub const MAX_POOL_SIZE: usize = 64;
/// Default bound on a single readiness wait inside `touch`.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT_MS
}

fn default_pool_size() -> i64 {
    1
}

/// Credentials and sizing for a [`Multiplexer`](crate::Multiplexer).
///
/// `pool_size` is signed so out-of-range requests (zero, negative, above
/// [`MAX_POOL_SIZE`]) can be expressed and clamped rather than rejected:
/// ```rust
/// use sql_multiplex::prelude::*;
///
/// let cfg = MultiplexConfig::new("app", "secret", "appdb", "localhost", 5432, 500);
/// assert_eq!(cfg.clamped_pool_size(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexConfig {
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_pool_size")]
    pub pool_size: i64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl MultiplexConfig {
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        pool_size: i64,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            database: database.into(),
            host: host.into(),
            port,
            pool_size,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
        }
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    /// Returns `SqlMultiplexError::JsonError` on malformed input or
    /// `SqlMultiplexError::ConfigError` if a required field is empty.
    pub fn from_json(json: &str) -> Result<Self, SqlMultiplexError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check that every field needed to reach the server is present.
    ///
    /// # Errors
    /// Returns `SqlMultiplexError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlMultiplexError> {
        if self.database.is_empty() {
            return Err(SqlMultiplexError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(SqlMultiplexError::ConfigError(
                "host is required".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(SqlMultiplexError::ConfigError(
                "port is required".to_string(),
            ));
        }
        if self.user.is_empty() {
            return Err(SqlMultiplexError::ConfigError(
                "user is required".to_string(),
            ));
        }
        Ok(())
    }

    /// `pool_size` clamped to `[MIN_POOL_SIZE, MAX_POOL_SIZE]`.
    #[must_use]
    pub fn clamped_pool_size(&self) -> usize {
        usize::try_from(self.pool_size)
            .unwrap_or(MIN_POOL_SIZE)
            .clamp(MIN_POOL_SIZE, MAX_POOL_SIZE)
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// The descriptor handed to a [`Connector`](crate::driver::Connector) for every new handle.
    #[must_use]
    pub fn target(&self) -> ConnectTarget {
        ConnectTarget {
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Where and as whom a native connection logs in.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl ConnectTarget {
    /// libpq-style `key=value` connection string.
    ///
    /// Values are single-quoted with `\` and `'` backslash-escaped.
    #[must_use]
    pub fn conninfo(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            quote_conninfo(&self.host),
            self.port,
            quote_conninfo(&self.database),
            quote_conninfo(&self.user),
            quote_conninfo(&self.password),
        )
    }
}

fn quote_conninfo(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

// Password stays out of logs.
impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
