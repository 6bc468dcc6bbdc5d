use std::time::Instant;

use attribution_core::{CostRow, MetricBatch, QueryIndex, TimeWindow, UsageRow};
use attribution_warehouse::UsageSource;
use observe_api::{MetricsSink, QuerySource};
use tracing::{info, instrument};

use crate::ledger::PublishLedger;
use crate::shape::{cost_batch, usage_batches};
use crate::types::{PipelineError, PipelineOptions, Result, RunOutcome, RunStats};

/// True when the fetch produced at least one query id to look up.
pub fn has_query_ids(query_ids: &[String]) -> bool {
    !query_ids.is_empty()
}

#[derive(Debug, Default)]
struct Published {
    batches_posted: usize,
    metrics_posted: usize,
    batches_skipped: usize,
}

/// One attribution pass: fetch external queries for the window, look up
/// their cost and usage rows, and publish the reshaped metrics.
pub struct Pipeline<'a> {
    queries: &'a dyn QuerySource,
    usage: &'a dyn UsageSource,
    metrics: &'a dyn MetricsSink,
    options: PipelineOptions,
    ledger: Option<&'a PublishLedger>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        queries: &'a dyn QuerySource,
        usage: &'a dyn UsageSource,
        metrics: &'a dyn MetricsSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            queries,
            usage,
            metrics,
            options,
            ledger: None,
        }
    }

    /// Skips batch types the ledger already holds and records each batch
    /// the sink accepts.
    pub fn with_ledger(mut self, ledger: &'a PublishLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[instrument(skip(self, window, auth_token), fields(window = %window))]
    pub async fn run(&self, window: &TimeWindow, auth_token: &str) -> Result<RunOutcome> {
        info!("Getting queries executed from {}", window);
        let records = self
            .queries
            .external_queries(window, auth_token)
            .await
            .map_err(PipelineError::Fetch)?;
        let index = QueryIndex::from_records(records);

        if !has_query_ids(index.query_ids()) {
            info!("No queries retrieved.");
            return Ok(RunOutcome::NoQueries);
        }

        let query_ids = index.query_ids();
        let (cost_rows, usage_rows) = tokio::try_join!(
            self.usage.cost_rows(query_ids),
            self.usage.usage_rows(query_ids)
        )?;
        info!(
            cost_rows = cost_rows.len(),
            usage_rows = usage_rows.len(),
            "warehouse lookups finished"
        );

        let mut stats = RunStats {
            queries: index.len(),
            cost_rows: cost_rows.len(),
            usage_rows: usage_rows.len(),
            ..RunStats::default()
        };
        let budget = self.options.publish_timeout;
        let started = Instant::now();
        let published = tokio::time::timeout(
            budget,
            self.shape_and_publish(&index, &cost_rows, &usage_rows, auth_token),
        )
        .await
        .map_err(|_elapsed| PipelineError::Timeout { budget })??;
        stats.batches_posted = published.batches_posted;
        stats.metrics_posted = published.metrics_posted;
        stats.batches_skipped = published.batches_skipped;
        info!(
            batches = stats.batches_posted,
            metrics = stats.metrics_posted,
            skipped = stats.batches_skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "attribution run published"
        );
        Ok(RunOutcome::Published(stats))
    }

    async fn shape_and_publish(
        &self,
        index: &QueryIndex,
        cost_rows: &[CostRow],
        usage_rows: &[UsageRow],
        auth_token: &str,
    ) -> Result<Published> {
        let cost = cost_batch(cost_rows, index)?;
        let usage = usage_batches(usage_rows, index)?;
        if cost.is_none() {
            info!("No costs to post");
        }
        if usage.is_empty() {
            info!("No rows processed to post");
        }

        let mut published = Published::default();
        for batch in cost.iter().chain(usage.iter()) {
            if self
                .ledger
                .is_some_and(|ledger| ledger.is_posted(batch.metric_type))
            {
                info!("Skipping {} batch posted by an earlier attempt", batch.metric_type);
                published.batches_skipped += 1;
                continue;
            }
            self.publish(batch, auth_token).await?;
            if let Some(ledger) = self.ledger {
                ledger.record(batch.metric_type);
            }
            published.batches_posted += 1;
            published.metrics_posted += batch.len();
        }
        Ok(published)
    }

    async fn publish(&self, batch: &MetricBatch, auth_token: &str) -> Result<()> {
        self.metrics
            .post_metrics(auth_token, batch)
            .await
            .map_err(|source| PipelineError::Publish {
                metric_type: batch.metric_type,
                source,
            })
    }
}
