use std::collections::HashSet;
use std::sync::Mutex;

use attribution_core::MetricType;

/// Batch types already accepted by the metrics API for one scheduled
/// interval. Shared across retry attempts so a retry never posts a batch
/// type twice.
#[derive(Debug, Default)]
pub struct PublishLedger {
    posted: Mutex<HashSet<MetricType>>,
}

impl PublishLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_posted(&self, metric_type: MetricType) -> bool {
        self.posted
            .lock()
            .map(|posted| posted.contains(&metric_type))
            .unwrap_or(false)
    }

    pub fn record(&self, metric_type: MetricType) {
        if let Ok(mut posted) = self.posted.lock() {
            posted.insert(metric_type);
        }
    }

    pub fn len(&self) -> usize {
        self.posted.lock().map(|posted| posted.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
