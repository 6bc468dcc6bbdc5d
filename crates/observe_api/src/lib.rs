mod client;
mod error;

use async_trait::async_trait;
use attribution_core::{MetricBatch, QueryRecord, TimeWindow};

pub use client::{CLIENT_IDENTIFIER_HEADER, ObserveClient, ObserveConfig};
pub use error::{ApiError, Result};

/// Source of external query metadata for a time window.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn external_queries(&self, window: &TimeWindow, token: &str) -> Result<Vec<QueryRecord>>;
}

/// Destination for metric batches; one call per batch.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn post_metrics(&self, token: &str, batch: &MetricBatch) -> Result<()>;
}
