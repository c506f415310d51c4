//! Staged CSV parsed into a table definition
//!
//! The snapshot carries no schema, so column types are inferred from the data
//! the same way a dataframe loader would: integers, then floats, then
//! booleans, falling back to text. Empty fields are NULL.
//!
//! The warehouse is fed the parsed rows re-encoded by [`StagedTable::copy_rows`],
//! never the snapshot bytes, so blank lines and quoted empty fields load the
//! same way they were inferred.

use banvic_common::{DatasetName, EtlError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::db::quote_ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }

    /// Narrowest type that still accepts every non-empty value seen
    fn infer<'a>(values: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut present = values.filter(|v| !v.is_empty()).peekable();
        if present.peek().is_none() {
            return ColumnType::Text;
        }
        if present.clone().all(|v| v.parse::<i64>().is_ok()) {
            ColumnType::BigInt
        } else if present
            .clone()
            .all(|v| v.parse::<f64>().is_ok_and(f64::is_finite))
        {
            ColumnType::Double
        } else if present.all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
        {
            ColumnType::Boolean
        } else {
            ColumnType::Text
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// One snapshot ready to be materialized in the warehouse
#[derive(Debug, Clone)]
pub struct StagedTable {
    pub name: DatasetName,
    pub columns: Vec<Column>,
    /// Data rows; `None` marks an empty field
    pub rows: Vec<Vec<Option<String>>>,
}

impl StagedTable {
    pub fn from_csv(name: DatasetName, raw: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(raw);

        let headers = reader
            .headers()
            .map_err(|e| EtlError::load(name.as_str(), format!("unreadable header: {}", e)))?
            .clone();
        if headers.is_empty() {
            return Err(EtlError::load(name.as_str(), "snapshot has no header row"));
        }

        let mut seen = HashSet::new();
        for header in headers.iter() {
            if header.is_empty() {
                return Err(EtlError::load(name.as_str(), "empty column name in header"));
            }
            if !seen.insert(header) {
                return Err(EtlError::load(
                    name.as_str(),
                    format!("duplicate column '{}' in header", header),
                ));
            }
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| EtlError::load(name.as_str(), e))?;
            records.push(record);
        }

        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| Column {
                name: header.to_string(),
                ty: ColumnType::infer(records.iter().map(move |r| &r[idx])),
            })
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect()
            })
            .collect();

        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote_ident(self.name.as_str()), columns)
    }

    /// `COPY` statement matching [`StagedTable::copy_rows`]
    ///
    /// `FORCE_NULL` makes a quoted empty field NULL as well; the writer emits
    /// one for a single-column row holding NULL.
    pub fn copy_in_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, FORCE_NULL ({}))",
            quote_ident(self.name.as_str()),
            columns,
            columns
        )
    }

    /// Parsed rows as headerless CSV, `None` written as an empty field
    pub fn copy_rows(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|field| field.as_deref().unwrap_or("")))
                .map_err(|e| EtlError::load(self.name.as_str(), e))?;
        }
        writer
            .into_inner()
            .map_err(|e| EtlError::load(self.name.as_str(), e.error()))
    }
}
