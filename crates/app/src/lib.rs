pub mod app;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod runner;
pub mod secrets;
pub mod util;

pub use app::{AppState, RunMode};
pub use config::{
    AppConfig, ConnectionConfig, IntervalParams, LAG_HOURS_RANGE, SnowflakeConnection,
    SqliteConnection,
};
pub use dry_run::DryRunSink;
pub use error::{AppError, ConfigError, Result, SecretError};
pub use runner::{RetryPolicy, run_with_retries};
pub use secrets::{EnvSecrets, SecretProvider, StaticSecrets};
pub use util::time::{parse_rfc3339_utc, previous_hour, resolve_interval};
