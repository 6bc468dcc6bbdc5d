mod window;

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use window::{DEFAULT_LAG_HOURS, ScheduledInterval, TimeWindow, format_rfc3339_micros};

/// External query metadata returned by the observability API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub query_id: String,
    pub asset_id: String,
    pub deployment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub run_id: String,
    pub dag_id: String,
    pub task_id: String,
    pub namespace: String,
}

/// One row of `account_usage.query_attribution_history`.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub query_id: String,
    pub end_time: DateTime<Utc>,
    pub credits_attributed: f64,
}

/// One row of `account_usage.query_history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub query_id: String,
    pub rows_produced: Option<u64>,
    pub rows_inserted: Option<u64>,
    pub rows_updated: Option<u64>,
    pub rows_deleted: Option<u64>,
    pub rows_unloaded: Option<u64>,
    pub total_elapsed_time: Option<u64>,
    pub bytes_scanned: Option<u64>,
    pub end_time: DateTime<Utc>,
}

impl UsageRow {
    pub fn metric_value(&self, metric: MetricType) -> Option<u64> {
        match metric {
            MetricType::RowsProduced => self.rows_produced,
            MetricType::RowsInserted => self.rows_inserted,
            MetricType::RowsUpdated => self.rows_updated,
            MetricType::RowsDeleted => self.rows_deleted,
            MetricType::RowsUnloaded => self.rows_unloaded,
            MetricType::TotalElapsedTime => self.total_elapsed_time,
            MetricType::BytesScanned => self.bytes_scanned,
            MetricType::Credits => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricCategory {
    Cost,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    #[serde(rename = "SNOWFLAKE_CREDITS")]
    Credits,
    #[serde(rename = "SNOWFLAKE_ROWS_PRODUCED")]
    RowsProduced,
    #[serde(rename = "SNOWFLAKE_ROWS_INSERTED")]
    RowsInserted,
    #[serde(rename = "SNOWFLAKE_ROWS_UPDATED")]
    RowsUpdated,
    #[serde(rename = "SNOWFLAKE_ROWS_DELETED")]
    RowsDeleted,
    #[serde(rename = "SNOWFLAKE_ROWS_UNLOADED")]
    RowsUnloaded,
    #[serde(rename = "SNOWFLAKE_TOTAL_ELAPSED_TIME")]
    TotalElapsedTime,
    #[serde(rename = "SNOWFLAKE_BYTES_SCANNED")]
    BytesScanned,
}

/// Usage metrics published per `query_history` row, in publish order.
pub const USAGE_METRICS: [MetricType; 7] = [
    MetricType::RowsProduced,
    MetricType::RowsInserted,
    MetricType::RowsUpdated,
    MetricType::RowsDeleted,
    MetricType::RowsUnloaded,
    MetricType::TotalElapsedTime,
    MetricType::BytesScanned,
];

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credits => "SNOWFLAKE_CREDITS",
            Self::RowsProduced => "SNOWFLAKE_ROWS_PRODUCED",
            Self::RowsInserted => "SNOWFLAKE_ROWS_INSERTED",
            Self::RowsUpdated => "SNOWFLAKE_ROWS_UPDATED",
            Self::RowsDeleted => "SNOWFLAKE_ROWS_DELETED",
            Self::RowsUnloaded => "SNOWFLAKE_ROWS_UNLOADED",
            Self::TotalElapsedTime => "SNOWFLAKE_TOTAL_ELAPSED_TIME",
            Self::BytesScanned => "SNOWFLAKE_BYTES_SCANNED",
        }
    }

    pub fn category(&self) -> MetricCategory {
        match self {
            Self::Credits => MetricCategory::Cost,
            _ => MetricCategory::Custom,
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer metrics stay integers on the wire; credits are fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(u64),
    Decimal(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub value: MetricValue,
    pub asset_id: String,
    pub deployment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub run_id: String,
    pub dag_id: String,
    pub task_id: String,
    pub namespace: String,
    pub timestamp: String,
}

impl MetricRecord {
    pub fn for_query(query: &QueryRecord, value: MetricValue, end_time: &DateTime<Utc>) -> Self {
        Self {
            value,
            asset_id: query.asset_id.clone(),
            deployment_id: query.deployment_id.clone(),
            workspace_id: query.workspace_id.clone(),
            run_id: query.run_id.clone(),
            dag_id: query.dag_id.clone(),
            task_id: query.task_id.clone(),
            namespace: query.namespace.clone(),
            timestamp: format_rfc3339_micros(end_time),
        }
    }
}

/// A named group of metric records published in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBatch {
    pub category: MetricCategory,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub metrics: Vec<MetricRecord>,
}

impl MetricBatch {
    pub fn new(metric_type: MetricType) -> Self {
        Self {
            category: metric_type.category(),
            metric_type,
            metrics: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Query records keyed by query id. Later duplicates replace earlier ones;
/// the id list keeps first-seen order.
#[derive(Debug, Clone, Default)]
pub struct QueryIndex {
    ids: Vec<String>,
    records: HashMap<String, QueryRecord>,
}

impl QueryIndex {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = QueryRecord>,
    {
        let mut index = Self::default();
        for record in records {
            match index.records.entry(record.query_id.clone()) {
                Entry::Occupied(mut entry) => {
                    entry.insert(record);
                }
                Entry::Vacant(entry) => {
                    index.ids.push(record.query_id.clone());
                    entry.insert(record);
                }
            }
        }
        index
    }

    pub fn query_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get(&self, query_id: &str) -> Option<&QueryRecord> {
        self.records.get(query_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
