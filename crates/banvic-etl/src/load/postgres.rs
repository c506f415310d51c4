//! PostgreSQL warehouse

use async_trait::async_trait;
use banvic_common::{DatasetName, Result};
use sqlx::{Connection, PgConnection};
use tracing::debug;

use super::table::StagedTable;
use super::Warehouse;
use crate::db;

/// Warehouse backed by a single PostgreSQL connection
pub struct PgWarehouse {
    conn: PgConnection,
}

impl PgWarehouse {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    pub async fn close(self) {
        db::close(self.conn).await;
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn drop_type(&mut self, type_name: &DatasetName) -> Result<()> {
        let statement = format!(
            "DROP TYPE IF EXISTS public.{} CASCADE",
            db::quote_ident(type_name.as_str())
        );
        sqlx::query(&statement).execute(&mut self.conn).await?;
        Ok(())
    }

    /// Drop, recreate and bulk-load the table in one transaction
    async fn replace_table(&mut self, table: &StagedTable) -> Result<u64> {
        let payload = table.copy_rows()?;
        let mut tx = self.conn.begin().await?;

        let drop = format!(
            "DROP TABLE IF EXISTS {}",
            db::quote_ident(table.name.as_str())
        );
        sqlx::query(&drop).execute(&mut *tx).await?;
        sqlx::query(&table.create_table_sql()).execute(&mut *tx).await?;

        let mut copy = tx.copy_in_raw(&table.copy_in_sql()).await?;
        copy.send(payload.as_slice()).await?;
        let rows = copy.finish().await?;

        tx.commit().await?;

        debug!(table = %table.name, rows, "Table replaced");
        Ok(rows)
    }
}
