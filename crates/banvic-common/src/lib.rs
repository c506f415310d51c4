//! BanVic Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the BanVic ETL workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the pipeline error taxonomy and result alias
//! - **Checksums**: snapshot integrity helpers
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: run dates, dataset names and task states
//!
//! # Example
//!
//! ```rust
//! use banvic_common::checksum::sha256_bytes;
//! use banvic_common::{DatasetName, Result, RunDate};
//!
//! fn describe(dataset: &str, contents: &[u8]) -> Result<()> {
//!     let run_date: RunDate = "2025-06-01".parse()?;
//!     let dataset: DatasetName = dataset.parse()?;
//!     let digest = sha256_bytes(contents);
//!     tracing::info!(%run_date, %dataset, %digest, "snapshot checksum");
//!     Ok(())
//! }
//!
//! describe("agencias", b"cod_agencia\n1\n").unwrap();
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{EtlError, Result};
pub use types::{DatasetName, RunDate, TaskState};
