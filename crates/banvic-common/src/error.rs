//! Error types for the BanVic pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Boxed underlying cause carried by extraction failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the pipeline
///
/// Only [`EtlError::MissingStagedSnapshot`] and [`EtlError::TypeDropFailure`]
/// are recoverable; the loader records them and keeps going. Everything else
/// fails the task it was raised in.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source file not found: {}", path.display())]
    MissingSourceFile { path: PathBuf },

    #[error("Staged snapshot for '{dataset}' not found at {}", path.display())]
    MissingStagedSnapshot { dataset: String, path: PathBuf },

    #[error("Extraction of '{dataset}' failed: {source}")]
    ExtractionFailure {
        dataset: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to drop warehouse type '{type_name}': {reason}")]
    TypeDropFailure { type_name: String, reason: String },

    #[error("Loading '{dataset}' failed: {reason}")]
    LoadFailure { dataset: String, reason: String },

    #[error("Invalid run date '{0}': expected YYYY-MM-DD")]
    InvalidRunDate(String),

    #[error("Invalid dataset name '{0}': expected a plain SQL identifier")]
    InvalidDatasetName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// Wrap any error raised while extracting `dataset`
    pub fn extraction(dataset: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EtlError::ExtractionFailure {
            dataset: dataset.into(),
            source: source.into(),
        }
    }

    pub fn load(dataset: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        EtlError::LoadFailure {
            dataset: dataset.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        EtlError::Config(msg.into())
    }

    /// Whether this error must fail the current task
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EtlError::MissingStagedSnapshot { .. } | EtlError::TypeDropFailure { .. }
        )
    }
}
