use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::config::MultiplexConfig;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    /// Credentials of the started server, ready for `Multiplexer::new`
    pub config: MultiplexConfig,
}

/// Start an embedded `PostgreSQL` server and create `database` in it.
///
/// The multiplexer drives its own runtime, so this must be called outside
/// any async context.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started, or the
/// database cannot be created.
pub fn setup_postgres_embedded(
    database: &str,
    pool_size: i64,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // Setup PostgreSQL binaries (bundled, so no download conflicts)
        postgresql.setup().await?;
        postgresql.start().await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let config = MultiplexConfig::new(
            settings.username.clone(),
            settings.password.clone(),
            database,
            settings.host.clone(),
            port,
            pool_size,
        );

        postgresql.create_database(database).await?;
        tracing::info!(port, database, "embedded PostgreSQL started");

        Ok(EmbeddedPostgres {
            postgresql,
            port,
            config,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
