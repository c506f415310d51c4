//! Command-line interface definition

use banvic_common::RunDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "banvic-etl")]
#[command(author, version, about = "BanVic daily ETL: stage source data and load the warehouse")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy the transactions file into the staging area
    ExtractFile {
        /// Run date (YYYY-MM-DD)
        #[arg(short, long)]
        run_date: RunDate,
    },

    /// Dump the operational tables into the staging area
    ExtractSql {
        /// Run date (YYYY-MM-DD)
        #[arg(short, long)]
        run_date: RunDate,
    },

    /// Load the staged snapshots of a run into the warehouse
    Load {
        /// Run date (YYYY-MM-DD)
        #[arg(short, long)]
        run_date: RunDate,
    },

    /// Run both extractions and then the load
    Run {
        /// Run date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(short, long)]
        run_date: Option<RunDate>,
    },

    /// Run the pipeline once a day at ETL_SCHEDULE_TIME (UTC)
    Schedule,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_date_argument() {
        let cli = Cli::try_parse_from(["banvic-etl", "load", "--run-date", "2025-06-01"]).unwrap();
        match cli.command {
            Command::Load { run_date } => assert_eq!(run_date.to_string(), "2025-06-01"),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["banvic-etl", "load", "--run-date", "06/01/2025"]).is_err());
    }

    #[test]
    fn test_run_date_is_optional_for_run() {
        let cli = Cli::try_parse_from(["banvic-etl", "-v", "run"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Run { run_date: None }));
    }
}
