use std::path::PathBuf;

use attribution_app::{IntervalParams, RunMode};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Attribute warehouse cost and usage to pipeline tasks")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short = 'c', long, env = "COST_ATTRIBUTION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless COST_ATTRIBUTION_LOG or RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, look up, and publish metrics for one interval (default)
    Run(RunArgs),
    /// Print the lagged query window for an interval and exit
    Window(IntervalArgs),
    /// Create or upgrade the SQLite account-usage mirror
    InitMirror {
        /// Defaults to the path of the configured sqlite connection
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Args)]
pub struct IntervalArgs {
    /// Interval start (RFC3339); requires --interval-end
    #[arg(long, requires = "interval_end")]
    pub interval_start: Option<String>,

    /// Interval end (RFC3339); requires --interval-start
    #[arg(long, requires = "interval_start")]
    pub interval_end: Option<String>,

    /// Override the configured lag between interval and query window
    #[arg(long)]
    pub lag_hours: Option<u32>,
}

impl IntervalArgs {
    pub fn params(&self) -> IntervalParams {
        IntervalParams {
            start: self.interval_start.clone(),
            end: self.interval_end.clone(),
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub interval: IntervalArgs,

    /// Log metric batches instead of posting them
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Publish
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_optional() {
        let cli = Cli::try_parse_from(["cost-attribution", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn interval_bounds_must_be_paired() {
        let err = Cli::try_parse_from([
            "cost-attribution",
            "run",
            "--interval-start",
            "2024-01-01T08:00:00Z",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "cost-attribution",
            "run",
            "--dry-run",
            "--lag-hours",
            "7",
            "--interval-start",
            "2024-01-01T08:00:00Z",
            "--interval-end",
            "2024-01-01T09:00:00Z",
        ])
        .unwrap();
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode(), RunMode::DryRun);
        assert_eq!(args.interval.lag_hours, Some(7));
        assert_eq!(
            args.interval.params().end.as_deref(),
            Some("2024-01-01T09:00:00Z")
        );
    }
}
