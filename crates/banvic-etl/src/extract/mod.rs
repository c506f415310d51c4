//! Extract stage: flat file and operational database into the staging area

pub mod file;
pub mod sql;

pub use file::{copy_to_staging, extract_file};
pub use sql::{extract_sql, extract_tables, PgSource, SourceDatabase};
