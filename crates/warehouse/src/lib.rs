mod error;
mod mirror;
mod queries;
mod snowflake;

use async_trait::async_trait;
use attribution_core::{CostRow, UsageRow};

pub use error::{Result, WarehouseError};
pub use mirror::{SqliteUsageSource, UsageMirror};
pub use queries::{
    ACCOUNT_USAGE_SCHEMA, MAX_IDS_PER_STATEMENT, cost_attribution_sql, placeholders,
    usage_history_sql,
};
pub use snowflake::{SnowflakeConfig, SnowflakeWarehouse, parse_epoch_timestamp};

/// Read-only lookups against the warehouse usage views, filtered by query id.
///
/// An empty id list returns no rows without issuing a statement.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn cost_rows(&self, query_ids: &[String]) -> Result<Vec<CostRow>>;

    async fn usage_rows(&self, query_ids: &[String]) -> Result<Vec<UsageRow>>;
}
