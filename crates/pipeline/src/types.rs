use std::time::Duration;

use attribution_core::MetricType;
use observe_api::ApiError;
use thiserror::Error;

/// Budget for the join and publish steps of one run.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub publish_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

/// Counts collected over a run that reached the publish step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub queries: usize,
    pub cost_rows: usize,
    pub usage_rows: usize,
    pub batches_posted: usize,
    pub metrics_posted: usize,
    /// Batch types skipped because an earlier attempt already posted them.
    pub batches_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The fetch returned no query ids; nothing was looked up or posted.
    NoQueries,
    Published(RunStats),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    CostAttribution,
    QueryHistory,
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CostAttribution => f.write_str("query_attribution_history"),
            Self::QueryHistory => f.write_str("query_history"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Fetch(#[source] ApiError),
    #[error("warehouse lookup failed: {0}")]
    Warehouse(#[from] attribution_warehouse::WarehouseError),
    #[error("{lookup} row for query {query_id} has no matching external query")]
    MissingCorrelation { query_id: String, lookup: Lookup },
    #[error("publishing {metric_type} failed: {source}")]
    Publish {
        metric_type: MetricType,
        source: ApiError,
    },
    #[error("join and publish exceeded {budget:?}")]
    Timeout { budget: Duration },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
