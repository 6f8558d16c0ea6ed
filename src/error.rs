use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlMultiplexError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Allocation error: {0}")]
    AllocError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlMultiplexError {
    /// The bare failure text, without the variant prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::ConfigError(msg)
            | Self::ConnectionError(msg)
            | Self::AllocError(msg)
            | Self::ExecutionError(msg)
            | Self::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
