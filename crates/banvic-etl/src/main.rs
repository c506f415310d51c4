//! BanVic ETL - pipeline host

use anyhow::Result;
use banvic_common::logging::{init_logging, LogConfig, LogLevel};
use banvic_common::RunDate;
use banvic_etl::{
    cli::{Cli, Command},
    config::Config,
    extract, load,
    pipeline::Pipeline,
    scheduler::DailyScheduler,
};
use clap::Parser;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("banvic-etl")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;
    info!(
        staging_dir = %config.staging.root.display(),
        source_file = %config.extract.source_file.display(),
        "Configuration loaded"
    );

    match cli.command {
        Command::ExtractFile { run_date } => {
            extract::extract_file(&config, run_date).await?;
        },
        Command::ExtractSql { run_date } => {
            let staged = extract::extract_sql(&config, run_date).await?;
            info!(tables = staged.len(), "SQL extraction complete");
        },
        Command::Load { run_date } => {
            let summary = load::load_warehouse(&config, run_date).await?;
            info!(
                loaded = ?summary.loaded_names(),
                skipped = summary.skipped.len(),
                "Load complete"
            );
        },
        Command::Run { run_date } => {
            let run_date = run_date.unwrap_or_else(RunDate::today);
            let report = Pipeline::from_config(config).run(run_date).await;
            info!(
                extract_file = %report.extract_file,
                extract_sql = %report.extract_sql,
                load = %report.load,
                "Run finished"
            );
            debug!(report = %serde_json::to_string(&report)?, "Run report");
            report.into_result()?;
        },
        Command::Schedule => {
            let daily_at = config.schedule.daily_at;
            let scheduler = DailyScheduler::new(Pipeline::from_config(config), daily_at);
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "Failed to listen for Ctrl+C");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        },
    }

    Ok(())
}
