//! BanVic ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Daily batch pipeline that stages a transactions file and the operational
//! `banvic` tables as run-dated CSV snapshots, then replaces the matching
//! tables in the analytical warehouse.
//!
//! # Stages
//!
//! - [`extract::extract_file`]: flat file into staging
//! - [`extract::extract_sql`]: full table dumps into staging
//! - [`load::load_warehouse`]: staged snapshots into warehouse tables
//!
//! [`pipeline::Pipeline`] runs the two extractions concurrently and only
//! releases the load when both succeeded; [`scheduler::DailyScheduler`] fires
//! it once a day.
//!
//! # Example
//!
//! ```no_run
//! use banvic_etl::{config::Config, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = Pipeline::from_config(config);
//!     pipeline.run("2025-06-01".parse()?).await.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod scheduler;
pub mod staging;

pub use cli::Cli;
pub use config::Config;
pub use pipeline::{Pipeline, RunReport};
