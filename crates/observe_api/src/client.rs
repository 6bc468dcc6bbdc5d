use std::time::Duration;

use async_trait::async_trait;
use attribution_core::{MetricBatch, QueryRecord, TimeWindow};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{ApiError, Result};
use crate::{MetricsSink, QuerySource};

pub const CLIENT_IDENTIFIER_HEADER: &str = "X-Astro-Client-Identifier";

#[derive(Debug, Clone)]
pub struct ObserveConfig {
    /// e.g. `https://api.astronomer.io/private/v1alpha1`
    pub base_url: Url,
    pub organization_id: String,
    pub client_identifier: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalQueriesResponse {
    #[serde(default)]
    external_queries: Vec<QueryRecord>,
}

/// HTTP client for the organization observability endpoints.
#[derive(Debug, Clone)]
pub struct ObserveClient {
    client: Client,
    client_identifier: String,
    observability_url: Url,
}

/// `{base}/organizations/{id}/observability/`, with the id kept as one
/// percent-encoded path segment.
fn observability_url(base_url: &Url, organization_id: &str) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithoutBase))?
        .pop_if_empty()
        .extend(["organizations", organization_id, "observability", ""]);
    Ok(url)
}

impl ObserveClient {
    pub fn new(config: ObserveConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let observability_url = observability_url(&config.base_url, &config.organization_id)?;
        Ok(Self {
            client,
            client_identifier: config.client_identifier,
            observability_url,
        })
    }

    pub fn external_queries_url(&self, window: &TimeWindow) -> Result<Url> {
        let mut url = self.observability_url.join("external-queries")?;
        url.query_pairs_mut()
            .append_pair("earliestTime", &window.earliest_time())
            .append_pair("latestTime", &window.latest_time());
        Ok(url)
    }

    pub fn metrics_url(&self) -> Result<Url> {
        Ok(self.observability_url.join("metrics")?)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header(CLIENT_IDENTIFIER_HEADER, &self.client_identifier)
    }
}

#[async_trait]
impl QuerySource for ObserveClient {
    #[instrument(skip(self, window, token), fields(window = %window))]
    async fn external_queries(&self, window: &TimeWindow, token: &str) -> Result<Vec<QueryRecord>> {
        let url = self.external_queries_url(window)?;
        info!("Getting queries from {}", url);

        let response = self
            .authorized(self.client.get(url), token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Fetch {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ExternalQueriesResponse = serde_json::from_str(&body)?;
        info!("Collected {} queries.", parsed.external_queries.len());
        Ok(parsed.external_queries)
    }
}

#[async_trait]
impl MetricsSink for ObserveClient {
    #[instrument(skip(self, token, batch), fields(metric_type = %batch.metric_type))]
    async fn post_metrics(&self, token: &str, batch: &MetricBatch) -> Result<()> {
        info!("Posting {} {} items", batch.len(), batch.metric_type);
        debug!(metrics = ?batch.metrics, "metric batch");

        let response = self
            .authorized(self.client.post(self.metrics_url()?), token)
            .json(batch)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Publish {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
