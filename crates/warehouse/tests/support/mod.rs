#![allow(dead_code)]

use std::path::PathBuf;

use attribution_warehouse::UsageMirror;
use rusqlite::{Connection, params};
use tempfile::TempDir;

pub struct TestMirror {
    pub _dir: TempDir,
    pub path: PathBuf,
}

pub fn setup_mirror() -> TestMirror {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("account_usage.sqlite");
    let mut mirror = UsageMirror::open(&path).expect("open mirror");
    mirror.migrate().expect("migrate mirror");
    TestMirror { _dir: dir, path }
}

pub fn insert_cost(path: &PathBuf, query_id: &str, end_time: &str, credits: Option<f64>) {
    let conn = Connection::open(path).expect("open conn");
    conn.execute(
        r#"
        INSERT INTO query_attribution_history (query_id, end_time, credits_attributed_compute)
        VALUES (?1, ?2, ?3)
        "#,
        params![query_id, end_time, credits],
    )
    .expect("insert cost row");
}

pub fn insert_usage(path: &PathBuf, query_id: &str, counts: [Option<i64>; 7], end_time: &str) {
    let conn = Connection::open(path).expect("open conn");
    conn.execute(
        r#"
        INSERT INTO query_history (
          query_id, rows_produced, rows_inserted, rows_updated, rows_deleted,
          rows_unloaded, total_elapsed_time, bytes_scanned, end_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            query_id, counts[0], counts[1], counts[2], counts[3], counts[4], counts[5], counts[6],
            end_time
        ],
    )
    .expect("insert usage row");
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
