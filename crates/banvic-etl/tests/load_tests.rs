//! Loading staged snapshots with an in-memory warehouse

mod common;

use banvic_common::EtlError;
use banvic_etl::load::load_snapshots;
use banvic_etl::staging::write_snapshot;
use common::*;
use std::path::Path;

const WAREHOUSE_TYPES: &[&str] = &["tipo_agencia", "tipo_cliente", "status_proposta"];

async fn stage(root: &Path, dataset: &str, csv: &str) {
    write_snapshot(root, run_date(), &dataset.parse().unwrap(), csv.as_bytes())
        .await
        .unwrap();
}

fn some(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[tokio::test]
async fn test_csv_replaces_prior_table() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "contas", "a,b,c\n1,x,2.5\n2,y,3.5\n").await;

    let mut warehouse = FakeWarehouse::default();
    warehouse.tables.insert(
        "contas".to_string(),
        FakeTable {
            columns: vec!["old".to_string()],
            rows: vec![vec![Some("1".to_string())]; 10],
        },
    );

    let summary = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["contas"]),
        &[],
    )
    .await
    .unwrap();

    let table = warehouse.table("contas");
    assert_eq!(table.columns, vec!["a", "b", "c"]);
    assert_eq!(table.rows, vec![some(&["1", "x", "2.5"]), some(&["2", "y", "3.5"])]);
    assert_eq!(summary.loaded[0].rows, 2);
    assert_eq!(summary.loaded[0].columns, 3);
}

#[tokio::test]
async fn test_missing_snapshot_is_skipped_and_others_load() {
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "transacoes", &table_csv("transacoes")).await;
    stage(dir.path(), "agencias", &table_csv("agencias")).await;
    stage(dir.path(), "contas", &table_csv("contas")).await;

    let mut warehouse = FakeWarehouse::default();
    let summary = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["transacoes", "agencias", "clientes", "contas"]),
        &[],
    )
    .await
    .unwrap();

    assert_eq!(summary.loaded_names(), vec!["transacoes", "agencias", "contas"]);
    assert_eq!(summary.skipped, names(&["clientes"]));
    assert!(!warehouse.tables.contains_key("clientes"));
}

#[tokio::test]
async fn test_reloading_same_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = names(&["transacoes", "agencias"]);
    stage(dir.path(), "transacoes", &table_csv("transacoes")).await;
    stage(dir.path(), "agencias", &table_csv("agencias")).await;

    let mut warehouse = FakeWarehouse::default();
    let first = load_snapshots(&mut warehouse, dir.path(), run_date(), &datasets, &[])
        .await
        .unwrap();
    let after_first = warehouse.tables.clone();
    let second = load_snapshots(&mut warehouse, dir.path(), run_date(), &datasets, &[])
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(warehouse.tables, after_first);
}

#[tokio::test]
async fn test_types_dropped_before_any_table() {
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "agencias", &table_csv("agencias")).await;

    let mut warehouse = FakeWarehouse::with_types(&["tipo_agencia"]);
    let summary = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["agencias"]),
        &names(WAREHOUSE_TYPES),
    )
    .await
    .unwrap();

    assert!(warehouse.types.is_empty());
    assert!(summary.failed_type_drops.is_empty());
    assert_eq!(
        warehouse.calls,
        vec![
            "drop_type tipo_agencia",
            "drop_type tipo_cliente",
            "drop_type status_proposta",
            "replace_table agencias",
        ]
    );
}

#[tokio::test]
async fn test_type_drop_failure_does_not_stop_load() {
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "agencias", &table_csv("agencias")).await;

    let mut warehouse = FakeWarehouse::with_types(&["tipo_agencia", "tipo_cliente"]);
    warehouse.undroppable_types.insert("tipo_agencia".to_string());

    let summary = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["agencias"]),
        &names(WAREHOUSE_TYPES),
    )
    .await
    .unwrap();

    assert_eq!(summary.failed_type_drops, names(&["tipo_agencia"]));
    assert!(warehouse.types.contains("tipo_agencia"));
    assert!(!warehouse.types.contains("tipo_cliente"));
    assert_eq!(summary.loaded_names(), vec!["agencias"]);
}

#[tokio::test]
async fn test_warehouse_error_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "agencias", &table_csv("agencias")).await;
    stage(dir.path(), "clientes", &table_csv("clientes")).await;

    let mut warehouse = FakeWarehouse::default();
    warehouse.failing_tables.insert("agencias".to_string());

    let err = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["agencias", "clientes"]),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EtlError::LoadFailure { ref dataset, .. } if dataset == "agencias"));
    assert!(!warehouse.tables.contains_key("clientes"));
}

#[tokio::test]
async fn test_malformed_snapshot_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    stage(dir.path(), "clientes", "id,nome\n1,Ana,extra\n").await;

    let mut warehouse = FakeWarehouse::default();
    let err = load_snapshots(
        &mut warehouse,
        dir.path(),
        run_date(),
        &names(&["clientes"]),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EtlError::LoadFailure { .. }));
    assert!(warehouse.calls.is_empty());
}
