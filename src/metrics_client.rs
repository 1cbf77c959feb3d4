//! Client for the time-series usage backend
//!
//! Speaks the Prometheus instant-query protocol: GET `/api/v1/query` with a
//! query string and an evaluation timestamp, answering an instant vector.
//! The client only decodes the envelope; interpreting the samples (cluster
//! registry lookup, numeric parsing) is the usage fetcher's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ConfcostError, Result};

/// Labels attached to a returned series. Only the cluster id and topic are
/// meaningful to the exporter; everything else is ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleLabels {
    #[serde(default)]
    pub kafka_id: String,
    #[serde(default)]
    pub topic: String,
}

/// One instant-vector element: labels plus an `[epoch_seconds, "value"]`
/// pair. The value stays string-encoded here; malformed numbers are dropped
/// per-sample downstream, not at decode time.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    pub metric: SampleLabels,
    pub value: (f64, String),
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[allow(dead_code)]
    status: String,
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    #[allow(dead_code)]
    result_type: String,
    #[serde(default)]
    result: Vec<VectorSample>,
}

/// Seam between the usage fetcher and the query backend, so the scheduler
/// can be driven by in-memory fakes in tests.
#[async_trait]
pub trait MetricsQuery: Send + Sync {
    /// Evaluate `query` at `at` and return the resulting instant vector.
    async fn query(&self, query: &str, at: DateTime<Utc>) -> Result<Vec<VectorSample>>;
}

/// reqwest-backed production client
pub struct MetricsClient {
    endpoint: String,
    client: reqwest::Client,
}

impl MetricsClient {
    /// Create a client against a backend base URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MetricsQuery for MetricsClient {
    async fn query(&self, query: &str, at: DateTime<Utc>) -> Result<Vec<VectorSample>> {
        let response = self
            .client
            .get(format!("{}/api/v1/query", self.endpoint))
            .query(&[("query", query), ("time", &at.timestamp().to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConfcostError::Api {
                status: response.status().as_u16(),
                context: "usage query backend",
            });
        }

        let payload: QueryResponse = response.json().await?;
        Ok(payload.data.result)
    }
}
