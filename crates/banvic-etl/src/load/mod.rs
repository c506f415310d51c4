//! Load stage: staged snapshots into the analytical warehouse
//!
//! Two kinds of trouble are tolerated here and only logged: a custom type that
//! cannot be dropped, and a dataset whose snapshot was never staged. Anything
//! else aborts the load.

pub mod postgres;
pub mod table;

use async_trait::async_trait;
use banvic_common::{DatasetName, EtlError, Result, RunDate};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::{db, staging};

pub use postgres::PgWarehouse;
pub use table::{Column, ColumnType, StagedTable};

/// Destination of the load stage
#[async_trait]
pub trait Warehouse: Send {
    /// Drop a custom type (and everything depending on it) if it exists
    async fn drop_type(&mut self, type_name: &DatasetName) -> Result<()>;

    /// Replace the table named after the snapshot; returns rows loaded
    async fn replace_table(&mut self, table: &StagedTable) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    pub dataset: DatasetName,
    pub columns: usize,
    pub rows: u64,
}

/// What one load invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub loaded: Vec<LoadedTable>,
    /// Datasets with no staged snapshot for the run
    pub skipped: Vec<DatasetName>,
    /// Custom types whose drop failed
    pub failed_type_drops: Vec<DatasetName>,
}

impl LoadSummary {
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|t| t.dataset.as_str()).collect()
    }
}

/// Load every staged dataset of `run_date` into the configured warehouse
pub async fn load_warehouse(config: &Config, run_date: RunDate) -> Result<LoadSummary> {
    let conn = db::connect(&config.warehouse_db).await.map_err(|e| {
        error!(error = %e, "Failed to connect to warehouse");
        e
    })?;
    let mut warehouse = PgWarehouse::new(conn);

    let result = load_snapshots(
        &mut warehouse,
        &config.staging.root,
        run_date,
        &config.load_datasets(),
        &config.load.warehouse_types,
    )
    .await;

    warehouse.close().await;
    result
}

/// Drop `types`, then replace one warehouse table per staged dataset
#[instrument(skip(warehouse, root, datasets, types), fields(datasets = datasets.len()))]
pub async fn load_snapshots<W>(
    warehouse: &mut W,
    root: &Path,
    run_date: RunDate,
    datasets: &[DatasetName],
    types: &[DatasetName],
) -> Result<LoadSummary>
where
    W: Warehouse + ?Sized,
{
    let mut summary = LoadSummary::default();

    for type_name in types {
        match warehouse.drop_type(type_name).await {
            Ok(()) => info!(type_name = %type_name, "Warehouse type dropped (if it existed)"),
            Err(e) => {
                let failure = EtlError::TypeDropFailure {
                    type_name: type_name.to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %failure, "Continuing without dropping type");
                summary.failed_type_drops.push(type_name.clone());
            },
        }
    }

    for dataset in datasets {
        let Some(raw) = staging::read_snapshot(root, run_date, dataset)
            .await
            .map_err(|e| EtlError::load(dataset.as_str(), e))?
        else {
            let missing = EtlError::MissingStagedSnapshot {
                dataset: dataset.to_string(),
                path: staging::snapshot_path(root, run_date, dataset),
            };
            warn!(error = %missing, "Skipping dataset");
            summary.skipped.push(dataset.clone());
            continue;
        };

        let table = StagedTable::from_csv(dataset.clone(), &raw).map_err(|e| {
            error!(dataset = %dataset, error = %e, "Unusable snapshot");
            e
        })?;

        let rows = warehouse.replace_table(&table).await.map_err(|e| {
            error!(dataset = %dataset, error = %e, "Failed to load table");
            EtlError::load(dataset.as_str(), e)
        })?;

        info!(
            dataset = %dataset,
            columns = table.columns.len(),
            rows,
            "Table loaded"
        );
        summary.loaded.push(LoadedTable {
            dataset: dataset.clone(),
            columns: table.columns.len(),
            rows,
        });
    }

    info!(
        loaded = summary.loaded.len(),
        skipped = summary.skipped.len(),
        failed_type_drops = summary.failed_type_drops.len(),
        "Load finished"
    );

    Ok(summary)
}
