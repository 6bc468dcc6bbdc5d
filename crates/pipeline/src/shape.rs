use attribution_core::{
    CostRow, MetricBatch, MetricRecord, MetricType, MetricValue, QueryIndex, QueryRecord,
    USAGE_METRICS, UsageRow,
};

use crate::types::{Lookup, PipelineError, Result};

fn correlate<'a>(index: &'a QueryIndex, query_id: &str, lookup: Lookup) -> Result<&'a QueryRecord> {
    index
        .get(query_id)
        .ok_or_else(|| PipelineError::MissingCorrelation {
            query_id: query_id.to_string(),
            lookup,
        })
}

/// One `COST`/`SNOWFLAKE_CREDITS` record per cost row. `None` when there are
/// no rows to publish.
pub fn cost_batch(rows: &[CostRow], index: &QueryIndex) -> Result<Option<MetricBatch>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let mut batch = MetricBatch::new(MetricType::Credits);
    for row in rows {
        let query = correlate(index, &row.query_id, Lookup::CostAttribution)?;
        batch.metrics.push(MetricRecord::for_query(
            query,
            MetricValue::Decimal(row.credits_attributed),
            &row.end_time,
        ));
    }
    Ok(Some(batch))
}

/// Seven `CUSTOM` batches, one per tracked usage column, each holding one
/// record per row. Null columns are published as zero.
pub fn usage_batches(rows: &[UsageRow], index: &QueryIndex) -> Result<Vec<MetricBatch>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let mut batches = USAGE_METRICS.map(MetricBatch::new);
    for row in rows {
        let query = correlate(index, &row.query_id, Lookup::QueryHistory)?;
        for batch in batches.iter_mut() {
            let value = row.metric_value(batch.metric_type).unwrap_or(0);
            batch.metrics.push(MetricRecord::for_query(
                query,
                MetricValue::Integer(value),
                &row.end_time,
            ));
        }
    }
    Ok(batches.into())
}
