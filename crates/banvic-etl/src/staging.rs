//! Run-dated staging area shared by the extractors and the loader
//!
//! Every snapshot lives at `<root>/<run-date>/<dataset>/<dataset>.csv`. The
//! extractors write through [`write_snapshot`] and the loader reads from
//! [`snapshot_path`], so both sides always agree on the layout.

use banvic_common::checksum::sha256_bytes;
use banvic_common::{DatasetName, Result, RunDate};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SNAPSHOT_EXTENSION: &str = "csv";

/// A snapshot file that was written for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedSnapshot {
    pub dataset: DatasetName,
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Directory holding every artifact of one run
pub fn run_dir(root: &Path, run_date: RunDate) -> PathBuf {
    root.join(run_date.to_string())
}

/// Directory holding one dataset's snapshot for a run
pub fn dataset_dir(root: &Path, run_date: RunDate, dataset: &DatasetName) -> PathBuf {
    run_dir(root, run_date).join(dataset.as_str())
}

/// Canonical location of a dataset's snapshot for a run
pub fn snapshot_path(root: &Path, run_date: RunDate, dataset: &DatasetName) -> PathBuf {
    dataset_dir(root, run_date, dataset).join(format!("{}.{}", dataset, SNAPSHOT_EXTENSION))
}

/// Create `dir` and its parents; an existing directory is fine
pub async fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

/// Snapshot bytes written next to their final path, not yet visible to readers
#[derive(Debug)]
pub struct PendingSnapshot {
    partial: PathBuf,
    snapshot: StagedSnapshot,
}

impl PendingSnapshot {
    pub fn dataset(&self) -> &DatasetName {
        &self.snapshot.dataset
    }

    /// Rename into place, replacing any previous snapshot
    pub async fn commit(self) -> std::io::Result<StagedSnapshot> {
        tokio::fs::rename(&self.partial, &self.snapshot.path).await?;
        debug!(
            dataset = %self.snapshot.dataset,
            path = %self.snapshot.path.display(),
            bytes = self.snapshot.bytes,
            "Snapshot written"
        );
        Ok(self.snapshot)
    }

    /// Remove the partial file; the previous snapshot, if any, is untouched
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.partial).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.partial.display(), error = %e, "Failed to remove partial snapshot");
            }
        }
    }
}

/// Write `contents` to a hidden sibling of the snapshot path
pub async fn stage_snapshot(
    root: &Path,
    run_date: RunDate,
    dataset: &DatasetName,
    contents: &[u8],
) -> std::io::Result<PendingSnapshot> {
    let dir = dataset_dir(root, run_date, dataset);
    ensure_dir(&dir).await?;

    let partial = dir.join(format!(".{}.{}.partial", dataset, SNAPSHOT_EXTENSION));
    if let Err(e) = tokio::fs::write(&partial, contents).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    Ok(PendingSnapshot {
        partial,
        snapshot: StagedSnapshot {
            dataset: dataset.clone(),
            path: snapshot_path(root, run_date, dataset),
            bytes: contents.len() as u64,
            sha256: sha256_bytes(contents),
        },
    })
}

/// Write a snapshot, replacing any previous one for the same run and dataset
///
/// Readers never observe a half-written snapshot.
pub async fn write_snapshot(
    root: &Path,
    run_date: RunDate,
    dataset: &DatasetName,
    contents: &[u8],
) -> std::io::Result<StagedSnapshot> {
    stage_snapshot(root, run_date, dataset, contents)
        .await?
        .commit()
        .await
}

/// Read a snapshot if it exists
pub async fn read_snapshot(
    root: &Path,
    run_date: RunDate,
    dataset: &DatasetName,
) -> Result<Option<Vec<u8>>> {
    let path = snapshot_path(root, run_date, dataset);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
