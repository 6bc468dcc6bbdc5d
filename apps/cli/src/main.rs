mod args;
mod logger;

use std::process::ExitCode;

use attribution_app::{AppConfig, AppError, AppState, resolve_interval};
use chrono::Utc;
use clap::Parser;
use pipeline::RunOutcome;
use tracing::{error, info};

use crate::args::{Cli, Command, IntervalArgs, RunArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

async fn dispatch(cli: Cli) -> Result<(), AppError> {
    let config_path = cli.config.as_deref();
    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => {
            let config = AppConfig::resolve(config_path, env_var, args.interval.lag_hours)?;
            let interval = resolve_interval(&args.interval.params(), Utc::now())?;
            let state = AppState::from_env(config);
            match state.run(&interval, args.mode()).await? {
                RunOutcome::NoQueries => info!("Nothing to attribute."),
                RunOutcome::Published(stats) => info!(
                    queries = stats.queries,
                    cost_rows = stats.cost_rows,
                    usage_rows = stats.usage_rows,
                    "Published {} metrics in {} batches",
                    stats.metrics_posted,
                    stats.batches_posted
                ),
            }
        }
        Command::Window(args) => print_window(config_path, &args)?,
        Command::InitMirror { path } => {
            let config = AppConfig::layered(config_path, env_var, None)?;
            let created = AppState::from_env(config).init_mirror(path.as_deref())?;
            println!("Mirror ready at {}", created.display());
        }
    }
    Ok(())
}

fn print_window(
    config_path: Option<&std::path::Path>,
    args: &IntervalArgs,
) -> Result<(), AppError> {
    let config = AppConfig::layered(config_path, env_var, args.lag_hours)?;
    config.check_lag()?;
    let interval = resolve_interval(&args.params(), Utc::now())?;
    let window = AppState::from_env(config).window_for(&interval);
    println!("earliestTime={}", window.earliest_time());
    println!("latestTime={}", window.latest_time());
    Ok(())
}
