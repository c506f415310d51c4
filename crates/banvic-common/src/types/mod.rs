//! Common types used across the pipeline

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EtlError;

/// Format of the run-date trigger parameter
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// PostgreSQL truncates identifiers longer than this
pub const MAX_IDENTIFIER_LEN: usize = 63;

// ============================================================================
// Run Date
// ============================================================================

/// Logical date one pipeline execution is keyed by.
///
/// Every staged artifact of a run lives under this date, so the textual form
/// is always `YYYY-MM-DD`.
///
/// ```rust
/// use banvic_common::RunDate;
///
/// let run_date: RunDate = "2025-06-01".parse().unwrap();
/// assert_eq!(run_date.to_string(), "2025-06-01");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunDate(NaiveDate);

impl RunDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date in UTC
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for RunDate {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // chrono accepts unpadded fields; the staging layout does not
        if trimmed.len() != 10 {
            return Err(EtlError::InvalidRunDate(s.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, RUN_DATE_FORMAT)
            .map(Self)
            .map_err(|_| EtlError::InvalidRunDate(s.to_string()))
    }
}

impl TryFrom<String> for RunDate {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunDate> for String {
    fn from(value: RunDate) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for RunDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RUN_DATE_FORMAT))
    }
}

// ============================================================================
// Dataset Name
// ============================================================================

/// Name of a logical table flowing through the pipeline.
///
/// The same name is used as a staging path component and as the warehouse
/// table name, so it is restricted to plain SQL identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetName(String);

impl DatasetName {
    pub fn new(name: impl Into<String>) -> Result<Self, EtlError> {
        let name = name.into();
        if is_plain_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(EtlError::InvalidDatasetName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for DatasetName {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for DatasetName {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasetName> for String {
    fn from(value: DatasetName) -> Self {
        value.0
    }
}

impl AsRef<str> for DatasetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Task State
// ============================================================================

/// State of one task within a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    /// Not attempted because a predecessor did not succeed
    UpstreamFailed,
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Success => "success",
            TaskState::Failed => "failed",
            TaskState::UpstreamFailed => "upstream_failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_run_date_parse_and_display() {
        let run_date: RunDate = "2025-06-01".parse().unwrap();
        assert_eq!(run_date.date(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(run_date.to_string(), "2025-06-01");
    }

    #[test]
    fn test_run_date_rejects_other_formats() {
        for bad in ["2025-6-1", "01/06/2025", "2025-02-30", "", "20250601"] {
            assert!(
                matches!(bad.parse::<RunDate>(), Err(EtlError::InvalidRunDate(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_dataset_name_validation() {
        assert!(DatasetName::new("propostas_credito").is_ok());
        assert!(DatasetName::new("_staging2").is_ok());

        for bad in ["", "2contas", "contas;drop", "../etc", "clientes ativos", "tabela\"x"] {
            assert!(DatasetName::new(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(DatasetName::new("a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn test_task_state_display() {
        assert_eq!(TaskState::default(), TaskState::Pending);
        assert_eq!(TaskState::UpstreamFailed.to_string(), "upstream_failed");
    }
}
