mod ledger;
mod pipeline;
mod shape;
mod types;

pub use ledger::PublishLedger;
pub use pipeline::{Pipeline, has_query_ids};
pub use shape::{cost_batch, usage_batches};
pub use types::{
    DEFAULT_PUBLISH_TIMEOUT, Lookup, PipelineError, PipelineOptions, Result, RunOutcome, RunStats,
};
