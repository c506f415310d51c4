//! Operational database extraction
//!
//! Dumps each configured table in full as CSV. Tables are all read before any
//! snapshot is written, so one unreadable table means the invocation stages
//! nothing.

use async_trait::async_trait;
use banvic_common::{DatasetName, EtlError, Result, RunDate};
use futures::StreamExt;
use sqlx::PgConnection;
use std::path::Path;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::db;
use crate::staging::{self, StagedSnapshot};

/// A database the relational extractor can dump tables from
#[async_trait]
pub trait SourceDatabase: Send {
    /// Full contents of `table` as CSV, header row first
    async fn dump_table(&mut self, table: &DatasetName) -> Result<Vec<u8>>;
}

/// Source database backed by a single PostgreSQL connection
pub struct PgSource {
    conn: PgConnection,
}

impl PgSource {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    pub async fn close(self) {
        db::close(self.conn).await;
    }
}

#[async_trait]
impl SourceDatabase for PgSource {
    async fn dump_table(&mut self, table: &DatasetName) -> Result<Vec<u8>> {
        let statement = format!(
            "COPY (SELECT * FROM {}) TO STDOUT WITH (FORMAT csv, HEADER true)",
            db::quote_ident(table.as_str())
        );

        let mut stream = self.conn.copy_out_raw(&statement).await?;
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

/// Stage every configured table for `run_date` from the source database
pub async fn extract_sql(config: &Config, run_date: RunDate) -> Result<Vec<StagedSnapshot>> {
    let conn = db::connect(&config.source_db).await.map_err(|e| {
        error!(error = %e, "Failed to connect to source database");
        e
    })?;
    let mut source = PgSource::new(conn);

    let result = extract_tables(
        &mut source,
        &config.staging.root,
        run_date,
        &config.extract.sql_tables,
    )
    .await;

    source.close().await;
    result
}

/// Read `tables` in order from `source`, then write one snapshot per table
///
/// Every dump is written to a partial file before any snapshot is replaced.
/// If any read or partial write fails, the partial files are removed and the
/// snapshots of earlier runs stay as they were.
#[instrument(skip(source, root, tables), fields(tables = tables.len()))]
pub async fn extract_tables<S>(
    source: &mut S,
    root: &Path,
    run_date: RunDate,
    tables: &[DatasetName],
) -> Result<Vec<StagedSnapshot>>
where
    S: SourceDatabase + ?Sized,
{
    let mut dumps = Vec::with_capacity(tables.len());
    for table in tables {
        let dump = source.dump_table(table).await.map_err(|e| {
            error!(table = %table, error = %e, "Failed to read table");
            EtlError::extraction(table.as_str(), e)
        })?;
        info!(table = %table, bytes = dump.len(), "Table read");
        dumps.push((table, dump));
    }

    let mut pending = Vec::with_capacity(dumps.len());
    for (table, dump) in dumps {
        match staging::stage_snapshot(root, run_date, table, &dump).await {
            Ok(snapshot) => pending.push(snapshot),
            Err(e) => {
                error!(table = %table, error = %e, "Failed to write staged snapshot");
                for snapshot in pending {
                    snapshot.discard().await;
                }
                return Err(EtlError::extraction(table.as_str(), e));
            },
        }
    }

    let mut written = Vec::with_capacity(pending.len());
    let mut pending = pending.into_iter();
    while let Some(snapshot) = pending.next() {
        let table = snapshot.dataset().clone();
        match snapshot.commit().await {
            Ok(snapshot) => {
                info!(
                    table = %table,
                    path = %snapshot.path.display(),
                    "Table extracted"
                );
                written.push(snapshot);
            },
            Err(e) => {
                error!(table = %table, error = %e, "Failed to move staged snapshot into place");
                for rest in pending {
                    rest.discard().await;
                }
                return Err(EtlError::extraction(table.as_str(), e));
            },
        }
    }

    Ok(written)
}
