use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("lag_hours {0} is outside the supported 6 to 8 hour range")]
    LagOutOfRange(u32),
    #[error("unknown warehouse connection '{0}'")]
    UnknownConnection(String),
    #[error("invalid url '{value}': {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {name} not found")]
    NotFound { name: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("warehouse error: {0}")]
    Warehouse(#[from] attribution_warehouse::WarehouseError),
    #[error("api client error: {0}")]
    Api(#[from] observe_api::ApiError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),
}

impl AppError {
    /// Setup failures repeat identically on every attempt, so only failures
    /// of the run itself are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
