mod support;

use attribution_warehouse::{
    MAX_IDS_PER_STATEMENT, SqliteUsageSource, UsageMirror, UsageSource, WarehouseError,
};
use chrono::{TimeZone, Utc};
use support::{ids, insert_cost, insert_usage, setup_mirror};

#[tokio::test]
async fn cost_rows_are_filtered_by_query_id() {
    let mirror = setup_mirror();
    insert_cost(&mirror.path, "q1", "2024-01-01T00:00:00Z", Some(3.5));
    insert_cost(&mirror.path, "q2", "2024-01-01T01:00:00+01:00", Some(0.25));
    insert_cost(&mirror.path, "other", "2024-01-01T00:00:00Z", Some(9.0));

    let source = SqliteUsageSource::new(&mirror.path);
    let mut rows = source.cost_rows(&ids(&["q1", "q2"])).await.expect("cost rows");
    rows.sort_by(|a, b| a.query_id.cmp(&b.query_id));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].query_id, "q1");
    assert_eq!(rows[0].credits_attributed, 3.5);
    assert_eq!(rows[1].end_time, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn usage_rows_keep_nulls_as_none() {
    let mirror = setup_mirror();
    insert_usage(
        &mirror.path,
        "q1",
        [Some(10), None, Some(2), None, None, Some(1200), Some(4096)],
        "2024-01-01T00:00:00.123456Z",
    );

    let source = SqliteUsageSource::new(&mirror.path);
    let rows = source.usage_rows(&ids(&["q1"])).await.expect("usage rows");

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.rows_produced, Some(10));
    assert_eq!(row.rows_inserted, None);
    assert_eq!(row.rows_updated, Some(2));
    assert_eq!(row.total_elapsed_time, Some(1200));
    assert_eq!(row.bytes_scanned, Some(4096));
    assert_eq!(row.end_time.timestamp_subsec_micros(), 123_456);
}

#[tokio::test]
async fn empty_id_list_returns_no_rows() {
    let mirror = setup_mirror();
    insert_cost(&mirror.path, "q1", "2024-01-01T00:00:00Z", Some(1.0));

    let source = SqliteUsageSource::new(&mirror.path);
    assert!(source.cost_rows(&[]).await.expect("cost rows").is_empty());
    assert!(source.usage_rows(&[]).await.expect("usage rows").is_empty());
}

#[test]
fn lookups_span_multiple_statement_chunks() {
    let mirror = setup_mirror();
    let total = MAX_IDS_PER_STATEMENT + 5;
    let query_ids = (0..total).map(|i| format!("q{i}")).collect::<Vec<_>>();
    insert_cost(&mirror.path, "q0", "2024-01-01T00:00:00Z", Some(1.0));
    insert_cost(
        &mirror.path,
        &format!("q{}", total - 1),
        "2024-01-01T00:00:00Z",
        None,
    );

    let db = UsageMirror::open(&mirror.path).expect("open mirror");
    let rows = db.cost_rows(&query_ids).expect("cost rows");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].credits_attributed, 0.0);
}

#[test]
fn migrate_is_idempotent() {
    let mirror = setup_mirror();
    let mut db = UsageMirror::open(&mirror.path).expect("open mirror");
    db.migrate().expect("migrate again");
}

#[test]
fn invalid_end_time_surfaces_parse_error() {
    let mirror = setup_mirror();
    insert_cost(&mirror.path, "q1", "yesterday", Some(1.0));

    let db = UsageMirror::open(&mirror.path).expect("open mirror");
    let err = db.cost_rows(&ids(&["q1"])).expect_err("parse failure");
    assert!(err.to_string().starts_with("time parse error"));
}

#[test]
fn negative_counts_are_rejected() {
    let mirror = setup_mirror();
    insert_usage(
        &mirror.path,
        "q1",
        [Some(10), Some(-1), None, None, None, None, None],
        "2024-01-01T00:00:00Z",
    );

    let db = UsageMirror::open(&mirror.path).expect("open mirror");
    let err = db.usage_rows(&ids(&["q1"])).expect_err("negative count");
    assert!(matches!(err, WarehouseError::Decode(_)));
    assert!(err.to_string().contains("negative count -1"));
}
