use std::sync::Arc;
use std::time::Duration;

use attribution_core::{ScheduledInterval, TimeWindow};
use attribution_warehouse::{
    SnowflakeConfig, SnowflakeWarehouse, SqliteUsageSource, UsageMirror, UsageSource,
};
use observe_api::{MetricsSink, ObserveClient, ObserveConfig};
use pipeline::{Pipeline, PipelineOptions, PublishLedger, RunOutcome};
use tracing::{info, instrument};

use crate::config::{AppConfig, ConnectionConfig, parse_url};
use crate::dry_run::DryRunSink;
use crate::error::{ConfigError, Result};
use crate::runner::{RetryPolicy, run_with_retries};
use crate::secrets::{EnvSecrets, SecretProvider};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Publish,
    /// Fetch and look up as usual, but log batches instead of posting them.
    DryRun,
}

/// Resolved configuration plus the secret source, shared by every attempt.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    secrets: Arc<dyn SecretProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { config, secrets }
    }

    /// Secrets come from the process environment under the configured prefix.
    pub fn from_env(config: AppConfig) -> Self {
        let secrets = EnvSecrets::new(config.secrets.env_prefix.clone());
        Self::new(config, Arc::new(secrets))
    }

    pub fn window_for(&self, interval: &ScheduledInterval) -> TimeWindow {
        TimeWindow::lagged(interval, self.config.lag())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.config.retry.retries,
            delay: self.config.retry_delay(),
        }
    }

    pub fn auth_token(&self) -> Result<String> {
        Ok(self.secrets.get_secret(&self.config.auth_token_secret)?)
    }

    pub fn observe_client(&self) -> Result<ObserveClient> {
        Ok(ObserveClient::new(ObserveConfig {
            base_url: self.config.api_base_url()?,
            organization_id: self.config.organization_id.clone(),
            client_identifier: self.config.client_identifier.clone(),
            request_timeout: self.config.request_timeout(),
        })?)
    }

    /// Builds the lookup backend named by `connection_id`.
    pub fn usage_source(&self) -> Result<Box<dyn UsageSource>> {
        match self.config.connection()? {
            ConnectionConfig::Snowflake(conn) => {
                let token = self.secrets.get_secret(&conn.token_secret)?;
                let warehouse = SnowflakeWarehouse::new(SnowflakeConfig {
                    account_url: parse_url(&conn.account_url)?,
                    token,
                    token_type: conn.token_type.clone(),
                    warehouse: conn.warehouse.clone(),
                    role: conn.role.clone(),
                    database: conn.database.clone(),
                    statement_timeout: Duration::from_secs(conn.statement_timeout_secs),
                    poll_interval: Duration::from_millis(conn.poll_interval_ms),
                    request_timeout: self.config.request_timeout(),
                })?;
                Ok(Box::new(warehouse))
            }
            ConnectionConfig::Sqlite(conn) => Ok(Box::new(SqliteUsageSource::new(&conn.path))),
        }
    }

    /// One attempt. Token and clients are resolved before any request is made.
    /// Batch types already in `ledger` are not posted again.
    #[instrument(
        skip(self, interval, ledger),
        fields(start = %interval.start, end = %interval.end)
    )]
    pub async fn run_once(
        &self,
        interval: &ScheduledInterval,
        mode: RunMode,
        ledger: &PublishLedger,
    ) -> Result<RunOutcome> {
        let token = self.auth_token()?;
        let client = self.observe_client()?;
        let usage = self.usage_source()?;
        let dry_run = DryRunSink;
        let sink: &dyn MetricsSink = match mode {
            RunMode::Publish => &client,
            RunMode::DryRun => &dry_run,
        };
        let options = PipelineOptions {
            publish_timeout: self.config.publish_timeout(),
        };
        let window = self.window_for(interval);
        info!("Attributing queries for window {}", window);
        let outcome = Pipeline::new(&client, usage.as_ref(), sink, options)
            .with_ledger(ledger)
            .run(&window, &token)
            .await?;
        Ok(outcome)
    }

    /// Runs with the configured whole-run retries. Attempts share one ledger,
    /// so a retry only posts the batch types that have not gone through yet.
    pub async fn run(&self, interval: &ScheduledInterval, mode: RunMode) -> Result<RunOutcome> {
        let ledger = PublishLedger::new();
        let ledger = &ledger;
        run_with_retries(&self.retry_policy(), move |_| {
            self.run_once(interval, mode, ledger)
        })
        .await
    }

    /// Creates (or upgrades) the SQLite mirror at the configured path.
    pub fn init_mirror(&self, path: Option<&std::path::Path>) -> Result<std::path::PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match self.config.connection()? {
                ConnectionConfig::Sqlite(conn) => conn.path.clone(),
                ConnectionConfig::Snowflake(_) => {
                    return Err(ConfigError::Missing(format!(
                        "sqlite path for connection '{}'",
                        self.config.connection_id
                    ))
                    .into());
                }
            },
        };
        let mut mirror = UsageMirror::open(&path)?;
        mirror.migrate()?;
        Ok(path)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish()
    }
}
