use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const LOG_ENV: &str = "COST_ATTRIBUTION_LOG";

/// Picks the filter directive: `LOG_ENV`, then `RUST_LOG`, then the verbosity flag.
fn filter_directive<F>(verbose: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(LOG_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string())
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logging(verbose: bool) {
    let directive = filter_directive(verbose, |name| std::env::var(name).ok());
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(build_filter(&directive))
        .with_target(false)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
