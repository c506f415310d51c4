//! Build automation tasks for the BanVic ETL workspace
//!
//! - Generating the operator CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for BanVic ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<banvic_etl::Cli>();

    let content = format!(
        r#"# banvic-etl CLI Reference

Generated from the CLI source code on {}.

## Overview

`banvic-etl` stages the daily transactions file and the operational `banvic`
tables as CSV snapshots under `<ETL_STAGING_DIR>/<run-date>/<dataset>/`, then
replaces the matching tables in the analytical warehouse.

## Quick Start

```bash
# Stage and load one day
banvic-etl run --run-date 2025-06-01

# Individual stages
banvic-etl extract-file --run-date 2025-06-01
banvic-etl extract-sql --run-date 2025-06-01
banvic-etl load --run-date 2025-06-01

# Run every day at ETL_SCHEDULE_TIME (UTC)
banvic-etl schedule
```

## Commands

{}

## Environment Variables

A `.env` file in the working directory is read on startup.

- `ETL_STAGING_DIR` - Staging root (default: `./data`)
- `ETL_SOURCE_FILE` - Transactions file (default: `./dags/transacoes.csv`)
- `ETL_FILE_DATASET` - Dataset name of the file snapshot (default: `transacoes`)
- `ETL_SQL_TABLES` - Comma-separated source tables
- `ETL_WAREHOUSE_TYPES` - Comma-separated warehouse types dropped before loading
- `ETL_SCHEDULE_TIME` - Daily trigger time, `HH:MM` UTC (default: `07:35`)
- `ETL_TASK_RETRIES` / `ETL_RETRY_DELAY_SECS` - Per-task retry policy (default: no retries)
- `ETL_CONNECT_TIMEOUT_SECS` - Database connect timeout (default: `30`)
- `SOURCE_DB_HOST`, `SOURCE_DB_PORT`, `SOURCE_DB_USER`, `SOURCE_DB_PASSWORD`, `SOURCE_DB_NAME`
- `DWH_DB_HOST`, `DWH_DB_PORT`, `DWH_DB_USER`, `DWH_DB_PASSWORD`, `DWH_DB_NAME`
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging
- `RUST_LOG` - Extra filter directives, combined with `LOG_LEVEL`

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
