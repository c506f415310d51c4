//! Pipeline host
//!
//! Runs one run date through the dependency graph:
//!
//! ```text
//! extract_file ─┐
//!               ├─> sync ─> load
//! extract_sql  ─┘
//! ```
//!
//! The extractors run concurrently. `sync` succeeds only when both of them
//! succeeded; otherwise `sync` and `load` end as `UpstreamFailed`. Retries are
//! a host policy applied per task; the stages themselves never retry.

use async_trait::async_trait;
use banvic_common::{EtlError, Result, RunDate, TaskState};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::extract::{extract_file, extract_sql};
use crate::load::{load_warehouse, LoadSummary};
use crate::staging::StagedSnapshot;

pub const TASK_EXTRACT_FILE: &str = "extract_file";
pub const TASK_EXTRACT_SQL: &str = "extract_sql";
pub const TASK_SYNC: &str = "sync";
pub const TASK_LOAD: &str = "load";

/// The three stages, as the host sees them
#[async_trait]
pub trait Stages: Send + Sync {
    async fn extract_file(&self, run_date: RunDate) -> Result<StagedSnapshot>;
    async fn extract_sql(&self, run_date: RunDate) -> Result<Vec<StagedSnapshot>>;
    async fn load(&self, run_date: RunDate) -> Result<LoadSummary>;
}

/// Stages wired to the configured file system and PostgreSQL databases
pub struct PostgresStages {
    config: Config,
}

impl PostgresStages {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stages for PostgresStages {
    async fn extract_file(&self, run_date: RunDate) -> Result<StagedSnapshot> {
        extract_file(&self.config, run_date).await
    }

    async fn extract_sql(&self, run_date: RunDate) -> Result<Vec<StagedSnapshot>> {
        extract_sql(&self.config, run_date).await
    }

    async fn load(&self, run_date: RunDate) -> Result<LoadSummary> {
        load_warehouse(&self.config, run_date).await
    }
}

/// A task that ended in failure, with the error it raised last
#[derive(Debug)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: EtlError,
}

/// Outcome of one pipeline run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_date: RunDate,
    pub extract_file: TaskState,
    pub extract_sql: TaskState,
    pub sync: TaskState,
    pub load: TaskState,
    pub staged: Vec<StagedSnapshot>,
    pub load_summary: Option<LoadSummary>,
    #[serde(skip)]
    pub failures: Vec<TaskFailure>,
}

impl RunReport {
    fn new(run_date: RunDate) -> Self {
        Self {
            run_date,
            extract_file: TaskState::Pending,
            extract_sql: TaskState::Pending,
            sync: TaskState::Pending,
            load: TaskState::Pending,
            staged: Vec::new(),
            load_summary: None,
            failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.load == TaskState::Success
    }

    /// The run as a `Result`, carrying the first task error on failure
    pub fn into_result(mut self) -> Result<Self> {
        if self.succeeded() {
            return Ok(self);
        }
        match self.failures.drain(..).next() {
            Some(failure) => Err(failure.error),
            None => Err(EtlError::config(format!(
                "run {} did not complete (load is {})",
                self.run_date, self.load
            ))),
        }
    }
}

/// Retry policy applied to each task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            retries: config.schedule.task_retries,
            delay: config.retry_delay(),
        }
    }
}

/// Executes the dependency graph for a run date
pub struct Pipeline<S> {
    stages: S,
    retry: RetryPolicy,
}

impl Pipeline<PostgresStages> {
    pub fn from_config(config: Config) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self::new(PostgresStages::new(config), retry)
    }
}

impl<S: Stages> Pipeline<S> {
    pub fn new(stages: S, retry: RetryPolicy) -> Self {
        Self { stages, retry }
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    /// Run both extractors, the barrier, then the load
    pub async fn run(&self, run_date: RunDate) -> RunReport {
        let span = info_span!("pipeline_run", run_date = %run_date);
        async move {
            info!("Pipeline run started");
            let mut report = RunReport::new(run_date);
            report.extract_file = TaskState::Running;
            report.extract_sql = TaskState::Running;

            let (file, sql) = tokio::join!(
                self.run_task(TASK_EXTRACT_FILE, || self.stages.extract_file(run_date)),
                self.run_task(TASK_EXTRACT_SQL, || self.stages.extract_sql(run_date)),
            );

            match file {
                Ok(snapshot) => {
                    report.extract_file = TaskState::Success;
                    report.staged.push(snapshot);
                },
                Err(error) => {
                    report.extract_file = TaskState::Failed;
                    report.failures.push(TaskFailure {
                        task: TASK_EXTRACT_FILE,
                        error,
                    });
                },
            }
            match sql {
                Ok(snapshots) => {
                    report.extract_sql = TaskState::Success;
                    report.staged.extend(snapshots);
                },
                Err(error) => {
                    report.extract_sql = TaskState::Failed;
                    report.failures.push(TaskFailure {
                        task: TASK_EXTRACT_SQL,
                        error,
                    });
                },
            }

            if report.extract_file != TaskState::Success || report.extract_sql != TaskState::Success
            {
                report.sync = TaskState::UpstreamFailed;
                report.load = TaskState::UpstreamFailed;
                error!(
                    extract_file = %report.extract_file,
                    extract_sql = %report.extract_sql,
                    "Extraction failed, load not attempted"
                );
                return report;
            }
            report.sync = TaskState::Success;
            info!("Extraction complete, releasing load");

            report.load = TaskState::Running;
            match self.run_task(TASK_LOAD, || self.stages.load(run_date)).await {
                Ok(summary) => {
                    report.load = TaskState::Success;
                    report.load_summary = Some(summary);
                    info!("Pipeline run succeeded");
                },
                Err(error) => {
                    report.load = TaskState::Failed;
                    report.failures.push(TaskFailure {
                        task: TASK_LOAD,
                        error,
                    });
                    error!("Pipeline run failed during load");
                },
            }

            report
        }
        .instrument(span)
        .await
    }

    async fn run_task<T, F, Fut>(&self, task: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().instrument(info_span!("task", task, attempt = tries)).await {
                Ok(value) => {
                    info!(task, "Task succeeded");
                    return Ok(value);
                },
                Err(e) if tries <= self.retry.retries => {
                    warn!(
                        task,
                        attempt = tries,
                        error = %e,
                        "Task failed, retrying in {:?}",
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                },
                Err(e) => {
                    error!(task, attempt = tries, error = %e, "Task failed");
                    return Err(e);
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_report_surfaces_first_error() {
        let mut report = RunReport::new("2025-06-01".parse().unwrap());
        report.extract_file = TaskState::Failed;
        report.failures.push(TaskFailure {
            task: TASK_EXTRACT_FILE,
            error: EtlError::MissingSourceFile {
                path: "transacoes.csv".into(),
            },
        });

        assert!(!report.succeeded());
        assert!(matches!(
            report.into_result(),
            Err(EtlError::MissingSourceFile { .. })
        ));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = Config::default();
        config.schedule.task_retries = 2;
        config.schedule.retry_delay_secs = 5;

        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.retries, 2);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::none().retries, 0);
    }
}
