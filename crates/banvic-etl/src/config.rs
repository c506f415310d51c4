//! Configuration management
//!
//! Everything the pipeline needs (paths, dataset lists, credentials, schedule)
//! is read once at startup into a [`Config`] and passed to each stage.

use banvic_common::{DatasetName, EtlError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default root under which run-dated snapshots are staged.
pub const DEFAULT_STAGING_DIR: &str = "./data";

/// Default flat file extracted by the file extractor.
pub const DEFAULT_SOURCE_FILE: &str = "./dags/transacoes.csv";

/// Default dataset name of the flat file.
pub const DEFAULT_FILE_DATASET: &str = "transacoes";

/// Default operational tables, in extraction order.
pub const DEFAULT_SQL_TABLES: &[&str] = &[
    "agencias",
    "clientes",
    "contas",
    "colaboradores",
    "propostas_credito",
];

/// Default warehouse enum types dropped before every load.
pub const DEFAULT_WAREHOUSE_TYPES: &[&str] = &["tipo_agencia", "tipo_cliente", "status_proposta"];

/// Default daily trigger time (UTC). 07:35 UTC is 04:35 in Brasília.
pub const DEFAULT_SCHEDULE_TIME: &str = "07:35";

/// Default number of retries per task.
pub const DEFAULT_TASK_RETRIES: u32 = 0;

/// Default delay between task retries in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 300;

/// Default database connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SOURCE_DB_HOST: &str = "localhost";
pub const DEFAULT_SOURCE_DB_PORT: u16 = 5432;
pub const DEFAULT_SOURCE_DB_USER: &str = "postgres";
pub const DEFAULT_SOURCE_DB_NAME: &str = "banvic";

pub const DEFAULT_DWH_DB_HOST: &str = "dwh_postgres";
pub const DEFAULT_DWH_DB_PORT: u16 = 5432;
pub const DEFAULT_DWH_DB_USER: &str = "dwh_user";
pub const DEFAULT_DWH_DB_PASSWORD: &str = "dwh_password";
pub const DEFAULT_DWH_DB_NAME: &str = "banvic_dwh";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub staging: StagingConfig,
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub source_db: DatabaseConfig,
    pub warehouse_db: DatabaseConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    pub root: PathBuf,
}

/// What the two extractors read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub source_file: PathBuf,
    pub file_dataset: DatasetName,
    pub sql_tables: Vec<DatasetName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Custom types dropped (CASCADE) before loading
    pub warehouse_types: Vec<DatasetName>,
}

/// Connection settings for one PostgreSQL database
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily trigger time, UTC
    pub daily_at: NaiveTime,
    pub task_retries: u32,
    pub retry_delay_secs: u64,
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        let connect_timeout_secs =
            env_parse("ETL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;

        let config = Config {
            staging: StagingConfig {
                root: PathBuf::from(env_or("ETL_STAGING_DIR", DEFAULT_STAGING_DIR)),
            },
            extract: ExtractConfig {
                source_file: PathBuf::from(env_or("ETL_SOURCE_FILE", DEFAULT_SOURCE_FILE)),
                file_dataset: env_or("ETL_FILE_DATASET", DEFAULT_FILE_DATASET).parse()?,
                sql_tables: env_list("ETL_SQL_TABLES", DEFAULT_SQL_TABLES)?,
            },
            load: LoadConfig {
                warehouse_types: env_list("ETL_WAREHOUSE_TYPES", DEFAULT_WAREHOUSE_TYPES)?,
            },
            source_db: DatabaseConfig {
                host: env_or("SOURCE_DB_HOST", DEFAULT_SOURCE_DB_HOST),
                port: env_parse("SOURCE_DB_PORT", DEFAULT_SOURCE_DB_PORT)?,
                user: env_or("SOURCE_DB_USER", DEFAULT_SOURCE_DB_USER),
                password: env_or("SOURCE_DB_PASSWORD", ""),
                database: env_or("SOURCE_DB_NAME", DEFAULT_SOURCE_DB_NAME),
                connect_timeout_secs,
            },
            warehouse_db: DatabaseConfig {
                host: env_or("DWH_DB_HOST", DEFAULT_DWH_DB_HOST),
                port: env_parse("DWH_DB_PORT", DEFAULT_DWH_DB_PORT)?,
                user: env_or("DWH_DB_USER", DEFAULT_DWH_DB_USER),
                password: env_or("DWH_DB_PASSWORD", DEFAULT_DWH_DB_PASSWORD),
                database: env_or("DWH_DB_NAME", DEFAULT_DWH_DB_NAME),
                connect_timeout_secs,
            },
            schedule: ScheduleConfig {
                daily_at: parse_schedule_time(&env_or("ETL_SCHEDULE_TIME", DEFAULT_SCHEDULE_TIME))?,
                task_retries: env_parse("ETL_TASK_RETRIES", DEFAULT_TASK_RETRIES)?,
                retry_delay_secs: env_parse("ETL_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.source_db.validate("source")?;
        self.warehouse_db.validate("warehouse")?;

        let mut seen = HashSet::new();
        for dataset in self.load_datasets() {
            if !seen.insert(dataset.clone()) {
                return Err(EtlError::config(format!(
                    "Dataset '{}' is listed more than once; staged snapshots would collide",
                    dataset
                )));
            }
        }

        if self.extract.sql_tables.is_empty() {
            tracing::warn!("No SQL tables configured - SQL extraction will stage nothing");
        }

        Ok(())
    }

    /// Every dataset the loader picks up: the flat file first, then the tables
    pub fn load_datasets(&self) -> Vec<DatasetName> {
        std::iter::once(self.extract.file_dataset.clone())
            .chain(self.extract.sql_tables.iter().cloned())
            .collect()
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.schedule.retry_delay_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging: StagingConfig {
                root: PathBuf::from(DEFAULT_STAGING_DIR),
            },
            extract: ExtractConfig {
                source_file: PathBuf::from(DEFAULT_SOURCE_FILE),
                file_dataset: default_names(&[DEFAULT_FILE_DATASET]).remove(0),
                sql_tables: default_names(DEFAULT_SQL_TABLES),
            },
            load: LoadConfig {
                warehouse_types: default_names(DEFAULT_WAREHOUSE_TYPES),
            },
            source_db: DatabaseConfig {
                host: DEFAULT_SOURCE_DB_HOST.to_string(),
                port: DEFAULT_SOURCE_DB_PORT,
                user: DEFAULT_SOURCE_DB_USER.to_string(),
                password: String::new(),
                database: DEFAULT_SOURCE_DB_NAME.to_string(),
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            warehouse_db: DatabaseConfig {
                host: DEFAULT_DWH_DB_HOST.to_string(),
                port: DEFAULT_DWH_DB_PORT,
                user: DEFAULT_DWH_DB_USER.to_string(),
                password: DEFAULT_DWH_DB_PASSWORD.to_string(),
                database: DEFAULT_DWH_DB_NAME.to_string(),
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            schedule: ScheduleConfig {
                daily_at: NaiveTime::from_hms_opt(7, 35, 0).unwrap_or(NaiveTime::MIN),
                task_retries: DEFAULT_TASK_RETRIES,
                retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            },
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.host.is_empty() {
            return Err(EtlError::config(format!("{} database host cannot be empty", role)));
        }
        if self.port == 0 {
            return Err(EtlError::config(format!("{} database port must be greater than 0", role)));
        }
        if self.database.is_empty() {
            return Err(EtlError::config(format!("{} database name cannot be empty", role)));
        }
        Ok(())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| EtlError::config(format!("{} has invalid value '{}': {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &[&str]) -> Result<Vec<DatasetName>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(DatasetName::from_str)
            .collect(),
        Err(_) => Ok(default_names(default)),
    }
}

fn default_names(names: &[&str]) -> Vec<DatasetName> {
    names
        .iter()
        .filter_map(|name| DatasetName::new(*name).ok())
        .collect()
}

fn parse_schedule_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| EtlError::config(format!("ETL_SCHEDULE_TIME must be HH:MM, got '{}'", raw)))
}
