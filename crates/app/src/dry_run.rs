use async_trait::async_trait;
use attribution_core::MetricBatch;
use observe_api::MetricsSink;
use tracing::{debug, info};

/// Logs each batch instead of posting it.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunSink;

#[async_trait]
impl MetricsSink for DryRunSink {
    async fn post_metrics(&self, _token: &str, batch: &MetricBatch) -> observe_api::Result<()> {
        info!(
            "Dry run: would post {} {} items",
            batch.len(),
            batch.metric_type
        );
        debug!(metrics = ?batch.metrics, "dry run batch");
        Ok(())
    }
}
