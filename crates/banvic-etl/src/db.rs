//! PostgreSQL connection helpers
//!
//! Each stage opens exactly one connection for the duration of its invocation;
//! there is no pool shared across runs.

use banvic_common::{EtlError, Result};
use sqlx::{ConnectOptions, PgConnection};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// Open a single connection, bounded by the configured timeout
pub async fn connect(config: &DatabaseConfig) -> Result<PgConnection> {
    debug!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connecting to PostgreSQL"
    );

    let options = config.connect_options();
    match tokio::time::timeout(config.connect_timeout(), options.connect()).await {
        Ok(conn) => Ok(conn?),
        Err(_) => Err(EtlError::Database(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!(
                "connecting to {}:{}/{} timed out after {}s",
                config.host, config.port, config.database, config.connect_timeout_secs
            ),
        )))),
    }
}

/// Close a connection, logging instead of failing if the goodbye is lost
pub async fn close(conn: PgConnection) {
    use sqlx::Connection;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close PostgreSQL connection cleanly");
    }
}

/// Quote an identifier for interpolation into DDL
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
