use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use attribution_core::{CostRow, UsageRow};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::UsageSource;
use crate::error::{Result, WarehouseError};
use crate::queries::{
    ACCOUNT_USAGE_SCHEMA, MAX_IDS_PER_STATEMENT, cost_attribution_sql, usage_history_sql,
};

const USER_AGENT: &str = concat!("cost-attribution/", env!("CARGO_PKG_VERSION"));

type RawRow = Vec<Option<String>>;

/// Connection settings for the Snowflake SQL API.
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    /// e.g. `https://<account>.snowflakecomputing.com`
    pub account_url: Url,
    pub token: String,
    pub token_type: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    pub database: Option<String>,
    pub statement_timeout: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct Binding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    bindings: BTreeMap<String, Binding<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[serde(default)]
    row_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    statement_handle: String,
    #[serde(default)]
    result_set_meta_data: ResultSetMetaData,
    #[serde(default)]
    data: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingResponse {
    statement_handle: String,
}

#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<RawRow>,
}

enum StatementPoll {
    Complete(StatementResponse),
    Running(String),
}

/// [`UsageSource`] backed by the Snowflake SQL API (`/api/v2/statements`).
pub struct SnowflakeWarehouse {
    client: Client,
    config: SnowflakeConfig,
    statements_url: Url,
}

impl std::fmt::Debug for SnowflakeWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeWarehouse")
            .field("statements_url", &self.statements_url.as_str())
            .finish()
    }
}

fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut url = url.clone();
        let path = format!("{}/", url.path());
        url.set_path(&path);
        url
    }
}

impl SnowflakeWarehouse {
    pub fn new(config: SnowflakeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let statements_url = ensure_slash(&config.account_url).join("api/v2/statements")?;
        Ok(Self {
            client,
            config,
            statements_url,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json");
        match self.config.token_type.as_deref() {
            Some(token_type) => request.header("X-Snowflake-Authorization-Token-Type", token_type),
            None => request,
        }
    }

    fn handle_url(&self, handle: &str) -> Result<Url> {
        Ok(ensure_slash(&self.statements_url).join(handle)?)
    }

    async fn read_poll(response: Response) -> Result<StatementPoll> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(StatementPoll::Complete(response.json().await?));
        }
        if status == StatusCode::ACCEPTED {
            let pending: PendingResponse = response.json().await?;
            return Ok(StatementPoll::Running(pending.statement_handle));
        }
        let body = response.text().await.unwrap_or_default();
        Err(WarehouseError::Statement {
            status: status.as_u16(),
            body,
        })
    }

    #[instrument(skip(self, sql, bindings), fields(bindings = bindings.len()))]
    async fn execute(&self, sql: &str, bindings: &[String]) -> Result<Vec<RawRow>> {
        let request = StatementRequest {
            statement: sql,
            timeout: self.config.statement_timeout.as_secs(),
            warehouse: self.config.warehouse.as_deref(),
            role: self.config.role.as_deref(),
            database: self.config.database.as_deref(),
            bindings: bindings
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    (
                        (index + 1).to_string(),
                        Binding {
                            kind: "TEXT",
                            value: value.as_str(),
                        },
                    )
                })
                .collect(),
        };
        let started = Instant::now();
        let response = self
            .authorized(self.client.post(self.statements_url.clone()))
            .json(&request)
            .send()
            .await?;
        let mut poll = Self::read_poll(response).await?;
        let complete = loop {
            match poll {
                StatementPoll::Complete(complete) => break complete,
                StatementPoll::Running(handle) => {
                    if started.elapsed() >= self.config.statement_timeout {
                        return Err(WarehouseError::StatementTimeout { handle });
                    }
                    debug!(%handle, "statement still running");
                    tokio::time::sleep(self.config.poll_interval).await;
                    let response = self
                        .authorized(self.client.get(self.handle_url(&handle)?))
                        .send()
                        .await?;
                    poll = Self::read_poll(response).await?;
                }
            }
        };

        let mut rows = complete.data;
        let partitions = complete.result_set_meta_data.partition_info;
        for (partition, info) in partitions.iter().enumerate().skip(1) {
            debug!(
                handle = %complete.statement_handle,
                partition,
                rows = info.row_count,
                "fetching result partition"
            );
            let mut url = self.handle_url(&complete.statement_handle)?;
            url.query_pairs_mut()
                .append_pair("partition", &partition.to_string());
            let response = self.authorized(self.client.get(url)).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(WarehouseError::Statement {
                    status: status.as_u16(),
                    body,
                });
            }
            let page: PartitionResponse = response.json().await?;
            rows.extend(page.data);
        }
        Ok(rows)
    }
}

#[async_trait]
impl UsageSource for SnowflakeWarehouse {
    async fn cost_rows(&self, query_ids: &[String]) -> Result<Vec<CostRow>> {
        let mut rows = Vec::new();
        for chunk in query_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let sql = cost_attribution_sql(ACCOUNT_USAGE_SCHEMA, chunk.len());
            for raw in self.execute(&sql, chunk).await? {
                rows.push(decode_cost_row(&raw)?);
            }
        }
        Ok(rows)
    }

    async fn usage_rows(&self, query_ids: &[String]) -> Result<Vec<UsageRow>> {
        let mut rows = Vec::new();
        for chunk in query_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let sql = usage_history_sql(ACCOUNT_USAGE_SCHEMA, chunk.len());
            for raw in self.execute(&sql, chunk).await? {
                rows.push(decode_usage_row(&raw)?);
            }
        }
        Ok(rows)
    }
}

/// Parses the SQL API timestamp encoding: epoch seconds with an optional
/// fraction, optionally followed by a timezone offset in minutes. Query end
/// times are never before the epoch, so signed values are rejected.
pub fn parse_epoch_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let epoch = value.split_whitespace().next()?;
    let (seconds, fraction) = match epoch.split_once('.') {
        Some((seconds, fraction)) => (seconds, fraction),
        None => (epoch, ""),
    };
    if !seconds.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seconds = seconds.parse::<i64>().ok()?;
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = fraction.chars().take(9).collect::<String>();
    while digits.len() < 9 {
        digits.push('0');
    }
    let nanos = digits.parse::<u32>().ok()?;
    DateTime::from_timestamp(seconds, nanos)
}

fn column<'a>(row: &'a [Option<String>], index: usize) -> Result<Option<&'a str>> {
    row.get(index)
        .map(|value| value.as_deref())
        .ok_or_else(|| WarehouseError::Decode(format!("missing column {index}")))
}

fn required<'a>(row: &'a [Option<String>], index: usize, name: &str) -> Result<&'a str> {
    column(row, index)?.ok_or_else(|| WarehouseError::Decode(format!("{name} is null")))
}

fn decode_end_time(row: &[Option<String>], index: usize) -> Result<DateTime<Utc>> {
    let value = required(row, index, "end_time")?;
    parse_epoch_timestamp(value)
        .ok_or_else(|| WarehouseError::Decode(format!("invalid end_time {value}")))
}

fn decode_count(row: &[Option<String>], index: usize) -> Result<Option<u64>> {
    let Some(value) = column(row, index)? else {
        return Ok(None);
    };
    if let Ok(parsed) = value.parse::<u64>() {
        return Ok(Some(parsed));
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(Some(parsed as u64)),
        Ok(parsed) if parsed < 0.0 => Err(WarehouseError::Decode(format!(
            "negative count {value}"
        ))),
        _ => Err(WarehouseError::Decode(format!("invalid number {value}"))),
    }
}

fn decode_cost_row(row: &[Option<String>]) -> Result<CostRow> {
    let credits_attributed = match column(row, 2)? {
        Some(value) => value
            .parse::<f64>()
            .map_err(|err| WarehouseError::Decode(format!("invalid credits {value}: {err}")))?,
        None => 0.0,
    };
    Ok(CostRow {
        query_id: required(row, 0, "query_id")?.to_string(),
        end_time: decode_end_time(row, 1)?,
        credits_attributed,
    })
}

fn decode_usage_row(row: &[Option<String>]) -> Result<UsageRow> {
    Ok(UsageRow {
        query_id: required(row, 0, "query_id")?.to_string(),
        rows_produced: decode_count(row, 1)?,
        rows_inserted: decode_count(row, 2)?,
        rows_updated: decode_count(row, 3)?,
        rows_deleted: decode_count(row, 4)?,
        rows_unloaded: decode_count(row, 5)?,
        total_elapsed_time: decode_count(row, 6)?,
        bytes_scanned: decode_count(row, 7)?,
        end_time: decode_end_time(row, 8)?,
    })
}
