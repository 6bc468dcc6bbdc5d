#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use attribution_core::{
    CostRow, MetricBatch, MetricType, QueryRecord, ScheduledInterval, TimeWindow, UsageRow,
};
use attribution_warehouse::{UsageSource, WarehouseError};
use chrono::{DateTime, TimeZone, Utc};
use observe_api::{ApiError, MetricsSink, QuerySource};
use tokio::sync::Barrier;

pub fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn window() -> TimeWindow {
    let interval = ScheduledInterval {
        start: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    };
    TimeWindow::lagged(&interval, chrono::Duration::hours(8))
}

pub fn query(query_id: &str) -> QueryRecord {
    QueryRecord {
        query_id: query_id.to_string(),
        asset_id: "a1".to_string(),
        deployment_id: "d1".to_string(),
        workspace_id: None,
        run_id: "r1".to_string(),
        dag_id: "dag1".to_string(),
        task_id: "t1".to_string(),
        namespace: "ns1".to_string(),
    }
}

pub fn cost_row(query_id: &str, credits: f64) -> CostRow {
    CostRow {
        query_id: query_id.to_string(),
        end_time: midnight(),
        credits_attributed: credits,
    }
}

pub fn usage_row(query_id: &str) -> UsageRow {
    UsageRow {
        query_id: query_id.to_string(),
        rows_produced: Some(10),
        rows_inserted: None,
        rows_updated: None,
        rows_deleted: None,
        rows_unloaded: None,
        total_elapsed_time: Some(250),
        bytes_scanned: Some(4096),
        end_time: midnight(),
    }
}

pub struct FakeQueries {
    pub records: Vec<QueryRecord>,
    pub fail_status: Option<u16>,
    pub calls: AtomicUsize,
}

impl FakeQueries {
    pub fn returning(records: Vec<QueryRecord>) -> Self {
        Self {
            records,
            fail_status: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            records: Vec::new(),
            fail_status: Some(status),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuerySource for FakeQueries {
    async fn external_queries(
        &self,
        _window: &TimeWindow,
        _token: &str,
    ) -> observe_api::Result<Vec<QueryRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(ApiError::Fetch {
                status,
                reason: "Unauthorized".to_string(),
                body: "bad token".to_string(),
            });
        }
        Ok(self.records.clone())
    }
}

pub struct FakeUsage {
    pub cost: Vec<CostRow>,
    pub usage: Vec<UsageRow>,
    pub calls: AtomicUsize,
    pub seen_ids: Mutex<Vec<Vec<String>>>,
    pub barrier: Option<Barrier>,
    pub fail: bool,
}

impl FakeUsage {
    pub fn new(cost: Vec<CostRow>, usage: Vec<UsageRow>) -> Self {
        Self {
            cost,
            usage,
            calls: AtomicUsize::new(0),
            seen_ids: Mutex::new(Vec::new()),
            barrier: None,
            fail: false,
        }
    }

    /// Both lookups must be in flight at once for either to finish.
    pub fn concurrent(cost: Vec<CostRow>, usage: Vec<UsageRow>) -> Self {
        Self {
            barrier: Some(Barrier::new(2)),
            ..Self::new(cost, usage)
        }
    }

    async fn enter(&self, query_ids: &[String]) -> attribution_warehouse::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_ids
            .lock()
            .expect("ids lock")
            .push(query_ids.to_vec());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail {
            return Err(WarehouseError::Statement {
                status: 500,
                body: "warehouse offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UsageSource for FakeUsage {
    async fn cost_rows(&self, query_ids: &[String]) -> attribution_warehouse::Result<Vec<CostRow>> {
        self.enter(query_ids).await?;
        Ok(self.cost.clone())
    }

    async fn usage_rows(
        &self,
        query_ids: &[String],
    ) -> attribution_warehouse::Result<Vec<UsageRow>> {
        self.enter(query_ids).await?;
        Ok(self.usage.clone())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<MetricBatch>>,
    pub fail_on: Option<MetricType>,
    pub delay: Option<Duration>,
}

impl RecordingSink {
    pub fn posted(&self) -> Vec<MetricBatch> {
        self.batches.lock().expect("batches lock").clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn post_metrics(&self, _token: &str, batch: &MetricBatch) -> observe_api::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(batch.metric_type) {
            return Err(ApiError::Publish {
                status: 500,
                body: "metrics store unavailable".to_string(),
            });
        }
        self.batches
            .lock()
            .expect("batches lock")
            .push(batch.clone());
        Ok(())
    }
}
