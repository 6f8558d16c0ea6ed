use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use super::connection::PgConnection;
use crate::config::ConnectTarget;
use crate::driver::Connector;
use crate::error::SqlMultiplexError;

/// Creates [`PgConnection`]s that share one tokio runtime.
///
/// The runtime is only ever entered for the bounded readiness waits inside
/// `touch`, so it should be a current-thread runtime that nothing else drives.
/// `touch` must not be called from inside another tokio runtime.
#[derive(Clone)]
pub struct PgConnector {
    runtime: Arc<Runtime>,
    connect_timeout: Option<Duration>,
}

impl PgConnector {
    /// Connector with a private current-thread runtime.
    ///
    /// # Errors
    /// Returns `SqlMultiplexError::IoError` if the runtime cannot be built.
    pub fn new() -> Result<Self, SqlMultiplexError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self::with_runtime(Arc::new(runtime)))
    }

    #[must_use]
    pub fn with_runtime(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            connect_timeout: None,
        }
    }

    /// Give up on a handshake that takes longer than `timeout`.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

/// Translate a connect target into tokio-postgres configuration.
#[must_use]
pub fn pg_config(target: &ConnectTarget, connect_timeout: Option<Duration>) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .user(&target.user)
        .password(&target.password)
        .dbname(&target.database)
        .host(&target.host)
        .port(target.port)
        .application_name("sql-multiplex");
    if let Some(timeout) = connect_timeout {
        config.connect_timeout(timeout);
    }
    config
}

impl Connector for PgConnector {
    type Connection = PgConnection;

    fn connect_start(
        &mut self,
        target: &ConnectTarget,
    ) -> Result<PgConnection, SqlMultiplexError> {
        let config = pg_config(target, self.connect_timeout);
        Ok(PgConnection::start(Arc::clone(&self.runtime), config))
    }
}

impl std::fmt::Debug for PgConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
