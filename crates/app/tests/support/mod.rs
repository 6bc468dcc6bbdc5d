#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use attribution_app::{AppConfig, AppState, ConnectionConfig, SqliteConnection, StaticSecrets};
use attribution_core::ScheduledInterval;
use attribution_warehouse::UsageMirror;
use chrono::{TimeZone, Utc};
use rusqlite::{Connection, params};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const QUERIES_PATH: &str =
    "/private/v1alpha1/organizations/org-1/observability/external-queries";
pub const METRICS_PATH: &str = "/private/v1alpha1/organizations/org-1/observability/metrics";

pub struct TestMirror {
    pub _dir: TempDir,
    pub path: PathBuf,
}

/// Mirror holding one cost row and one usage row for `q1`.
pub fn seeded_mirror() -> TestMirror {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("account_usage.sqlite");
    let mut mirror = UsageMirror::open(&path).expect("open mirror");
    mirror.migrate().expect("migrate mirror");

    let conn = Connection::open(&path).expect("open conn");
    conn.execute(
        "INSERT INTO query_attribution_history (query_id, end_time, credits_attributed_compute)
         VALUES (?1, ?2, ?3)",
        params!["q1", "2024-01-01T00:30:00Z", 0.25_f64],
    )
    .expect("insert cost row");
    conn.execute(
        "INSERT INTO query_history (
           query_id, rows_produced, rows_inserted, rows_updated, rows_deleted,
           rows_unloaded, total_elapsed_time, bytes_scanned, end_time
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            "q1",
            10_i64,
            Option::<i64>::None,
            0_i64,
            0_i64,
            0_i64,
            1500_i64,
            4096_i64,
            "2024-01-01T00:30:00Z"
        ],
    )
    .expect("insert usage row");
    TestMirror { _dir: dir, path }
}

pub fn config(api_base: &str, mirror: &PathBuf) -> AppConfig {
    let mut connections = BTreeMap::new();
    connections.insert(
        "mirror".to_string(),
        ConnectionConfig::Sqlite(SqliteConnection {
            path: mirror.clone(),
        }),
    );
    let mut config = AppConfig {
        organization_id: "org-1".to_string(),
        api_base_url: format!("{}/private/v1alpha1", api_base),
        connection_id: "mirror".to_string(),
        connections,
        ..AppConfig::default()
    };
    config.retry.retries = 0;
    config.retry.delay_secs = 0;
    config.validate().expect("valid config");
    config
}

pub fn state(config: AppConfig) -> AppState {
    let secrets = StaticSecrets::new().with("AUTH_TOKEN", "token-1");
    AppState::new(config, Arc::new(secrets))
}

pub fn interval() -> ScheduledInterval {
    ScheduledInterval {
        start: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub fn queries_body() -> Value {
    json!({
        "externalQueries": [{
            "queryId": "q1",
            "assetId": "a1",
            "deploymentId": "d1",
            "workspaceId": "w1",
            "runId": "r1",
            "dagId": "dag1",
            "taskId": "t1",
            "namespace": "ns1"
        }]
    })
}
