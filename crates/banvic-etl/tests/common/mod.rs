//! Shared helpers for the banvic-etl integration tests
//!
//! - in-memory [`SourceDatabase`] and [`Warehouse`] fakes for tests that only
//!   need the staging protocol
//! - a PostgreSQL testcontainer for the end-to-end tests (require Docker)

#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use banvic_common::{DatasetName, EtlError, RunDate};
use banvic_etl::config::DatabaseConfig;
use banvic_etl::extract::SourceDatabase;
use banvic_etl::load::{StagedTable, Warehouse};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;

pub const RUN_DATE: &str = "2025-06-01";

pub const SQL_TABLES: &[&str] = &[
    "agencias",
    "clientes",
    "contas",
    "colaboradores",
    "propostas_credito",
];

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("banvic_etl=debug")
        .with_test_writer()
        .try_init();
}

pub fn run_date() -> RunDate {
    RUN_DATE.parse().expect("valid run date")
}

pub fn names(names: &[&str]) -> Vec<DatasetName> {
    names
        .iter()
        .map(|n| n.parse().expect("valid dataset name"))
        .collect()
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, contents).expect("write file");
}

/// Small CSV dump for a table, distinct per table name
pub fn table_csv(table: &str) -> String {
    format!("id,nome\n1,{table}_a\n2,{table}_b\n")
}

// ============================================================================
// Fake source database
// ============================================================================

#[derive(Default)]
pub struct FakeSource {
    tables: HashMap<String, Vec<u8>>,
    pub reads: Vec<String>,
}

impl FakeSource {
    pub fn with_tables(tables: &[&str]) -> Self {
        let mut source = Self::default();
        for table in tables {
            source.put(table, &table_csv(table));
        }
        source
    }

    pub fn put(&mut self, table: &str, csv: &str) {
        self.tables.insert(table.to_string(), csv.as_bytes().to_vec());
    }

    pub fn remove(&mut self, table: &str) {
        self.tables.remove(table);
    }
}

#[async_trait]
impl SourceDatabase for FakeSource {
    async fn dump_table(&mut self, table: &DatasetName) -> banvic_common::Result<Vec<u8>> {
        self.reads.push(table.to_string());
        self.tables.get(table.as_str()).cloned().ok_or_else(|| {
            EtlError::Database(sqlx::Error::Protocol(format!(
                "relation \"{}\" does not exist",
                table
            )))
        })
    }
}

// ============================================================================
// Fake warehouse
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Default)]
pub struct FakeWarehouse {
    pub tables: BTreeMap<String, FakeTable>,
    pub types: HashSet<String>,
    pub undroppable_types: HashSet<String>,
    pub failing_tables: HashSet<String>,
    pub calls: Vec<String>,
}

impl FakeWarehouse {
    pub fn with_types(types: &[&str]) -> Self {
        Self {
            types: types.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn table(&self, name: &str) -> &FakeTable {
        self.tables
            .get(name)
            .unwrap_or_else(|| panic!("table {name} not loaded"))
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn drop_type(&mut self, type_name: &DatasetName) -> banvic_common::Result<()> {
        self.calls.push(format!("drop_type {type_name}"));
        if self.undroppable_types.contains(type_name.as_str()) {
            return Err(EtlError::Database(sqlx::Error::Protocol(format!(
                "must be owner of type {type_name}"
            ))));
        }
        self.types.remove(type_name.as_str());
        Ok(())
    }

    async fn replace_table(&mut self, table: &StagedTable) -> banvic_common::Result<u64> {
        self.calls.push(format!("replace_table {}", table.name));
        if self.failing_tables.contains(table.name.as_str()) {
            return Err(EtlError::Database(sqlx::Error::Protocol(
                "connection reset".to_string(),
            )));
        }
        self.tables.insert(
            table.name.to_string(),
            FakeTable {
                columns: table.columns.iter().map(|c| c.name.clone()).collect(),
                rows: table.rows.clone(),
            },
        );
        Ok(table.row_count() as u64)
    }
}

// ============================================================================
// PostgreSQL test container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    host: String,
    port: u16,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;
        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?
            .to_string();
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        Ok(Self {
            _container: container,
            host,
            port,
        })
    }

    pub fn database(&self, name: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host.clone(),
            port: self.port,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: name.to_string(),
            connect_timeout_secs: 30,
        }
    }
}
