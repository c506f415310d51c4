//! Flat-file extraction
//!
//! Copies the configured source file, byte for byte, into the staging area
//! under the run date.

use banvic_common::{DatasetName, EtlError, Result, RunDate};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::staging::{self, StagedSnapshot};

/// Stage the configured flat file for `run_date`
pub async fn extract_file(config: &Config, run_date: RunDate) -> Result<StagedSnapshot> {
    copy_to_staging(
        &config.extract.source_file,
        &config.staging.root,
        run_date,
        &config.extract.file_dataset,
    )
    .await
}

/// Copy `source` to the snapshot path of `dataset` for `run_date`
///
/// The source is checked before anything is created, so a missing file leaves
/// the staging area untouched. Re-running overwrites the previous snapshot.
#[instrument(skip(source, root), fields(source = %source.display()))]
pub async fn copy_to_staging(
    source: &Path,
    root: &Path,
    run_date: RunDate,
    dataset: &DatasetName,
) -> Result<StagedSnapshot> {
    let contents = match tokio::fs::read(source).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!("Source file {} not found", source.display());
            return Err(EtlError::MissingSourceFile {
                path: source.to_path_buf(),
            });
        },
        Err(e) => {
            error!(error = %e, "Failed to read source file");
            return Err(EtlError::extraction(dataset.as_str(), e));
        },
    };

    let snapshot = staging::write_snapshot(root, run_date, dataset, &contents)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to write staged snapshot");
            EtlError::extraction(dataset.as_str(), e)
        })?;

    info!(
        path = %snapshot.path.display(),
        bytes = snapshot.bytes,
        sha256 = %snapshot.sha256,
        "File extracted"
    );

    Ok(snapshot)
}
