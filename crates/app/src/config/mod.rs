use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const ORGANIZATION_ID_ENV: &str = "ASTRO_ORGANIZATION_ID";
pub const CONNECTION_ID_ENV: &str = "WAREHOUSE_CONN_ID";
pub const API_BASE_URL_ENV: &str = "COST_ATTRIBUTION_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://api.astronomer.io/private/v1alpha1";
pub const DEFAULT_CLIENT_IDENTIFIER: &str = "astro-observe-sdk";
pub const DEFAULT_AUTH_TOKEN_SECRET: &str = "AUTH_TOKEN";
pub const DEFAULT_CONNECTION_ID: &str = "snowflake";

/// Billing views settle within this many hours.
pub const LAG_HOURS_RANGE: std::ops::RangeInclusive<u32> = 6..=8;

/// RFC3339 bounds of the scheduled interval, as given on the command line.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IntervalParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Everything one run needs, resolved once at startup.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub organization_id: String,
    pub api_base_url: String,
    pub client_identifier: String,
    pub lag_hours: u32,
    pub auth_token_secret: String,
    pub request_timeout_secs: u64,
    pub publish_timeout_secs: u64,
    pub connection_id: String,
    pub retry: RetryConfig,
    pub secrets: SecretsConfig,
    pub connections: BTreeMap<String, ConnectionConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organization_id: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_identifier: DEFAULT_CLIENT_IDENTIFIER.to_string(),
            lag_hours: attribution_core::DEFAULT_LAG_HOURS,
            auth_token_secret: DEFAULT_AUTH_TOKEN_SECRET.to_string(),
            request_timeout_secs: 30,
            publish_timeout_secs: pipeline::DEFAULT_PUBLISH_TIMEOUT.as_secs(),
            connection_id: DEFAULT_CONNECTION_ID.to_string(),
            retry: RetryConfig::default(),
            secrets: SecretsConfig::default(),
            connections: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Re-executions after the first attempt.
    pub retries: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            delay_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    pub env_prefix: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Snowflake(SnowflakeConnection),
    Sqlite(SqliteConnection),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SnowflakeConnection {
    pub account_url: String,
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SqliteConnection {
    pub path: PathBuf,
}

fn default_token_secret() -> String {
    "SNOWFLAKE_TOKEN".to_string()
}

fn default_statement_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads the file when given, otherwise starts from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Overlays environment values; empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        if let Some(value) = get(ORGANIZATION_ID_ENV) {
            self.organization_id = value;
        }
        if let Some(value) = get(CONNECTION_ID_ENV) {
            self.connection_id = value;
        }
        if let Some(value) = get(API_BASE_URL_ENV) {
            self.api_base_url = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization_id.trim().is_empty() {
            return Err(ConfigError::Missing(ORGANIZATION_ID_ENV.to_string()));
        }
        self.check_lag()?;
        self.api_base_url()?;
        if let ConnectionConfig::Snowflake(snowflake) = self.connection()? {
            parse_url(&snowflake.account_url)?;
        }
        Ok(())
    }

    /// File, then environment, then the command-line lag override.
    pub fn layered<F>(
        path: Option<&Path>,
        lookup: F,
        lag_hours: Option<u32>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load(path)?;
        config.apply_env(lookup);
        if let Some(lag_hours) = lag_hours {
            config.lag_hours = lag_hours;
        }
        Ok(config)
    }

    /// [`AppConfig::layered`] followed by validation.
    pub fn resolve<F>(
        path: Option<&Path>,
        lookup: F,
        lag_hours: Option<u32>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::layered(path, lookup, lag_hours)?;
        config.validate()?;
        Ok(config)
    }

    pub fn check_lag(&self) -> Result<(), ConfigError> {
        if LAG_HOURS_RANGE.contains(&self.lag_hours) {
            Ok(())
        } else {
            Err(ConfigError::LagOutOfRange(self.lag_hours))
        }
    }

    pub fn connection(&self) -> Result<&ConnectionConfig, ConfigError> {
        self.connections
            .get(&self.connection_id)
            .ok_or_else(|| ConfigError::UnknownConnection(self.connection_id.clone()))
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        parse_url(&self.api_base_url)
    }

    pub fn lag(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lag_hours))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry.delay_secs)
    }
}

pub(crate) fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}
