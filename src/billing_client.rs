//! Client for the billing API
//!
//! Fetches the raw cost line items for a date window: GET
//! `/billing/v1/costs?start_date=..&end_date=..` with basic auth. Lines come
//! back with string-typed product/line-type/unit fields; classifying them
//! against the closed enums happens in the billing fetcher, per-line.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ConfcostError, Result};
use crate::types::CalendarDay;

/// Resource a billing line is attached to. Only the id matters here; it is
/// resolved against the cluster registry downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

/// One raw line item as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBillingLine {
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub line_type: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub resource: BillingResource,
    #[serde(default)]
    pub unit: String,
}

/// Response envelope for the costs endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingResponse {
    #[serde(default)]
    pub data: Vec<RawBillingLine>,
}

/// Seam between the billing fetcher and the provider API.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Fetch all billing lines whose window falls inside [start, end].
    async fn costs(&self, start: CalendarDay, end: CalendarDay) -> Result<BillingResponse>;
}

/// reqwest-backed production client
pub struct BillingClient {
    endpoint: String,
    api_key_id: String,
    api_key_secret: String,
    client: reqwest::Client,
}

impl BillingClient {
    /// Create a client against the billing API base URL
    pub fn new(
        endpoint: impl Into<String>,
        api_key_id: impl Into<String>,
        api_key_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key_id: api_key_id.into(),
            api_key_secret: api_key_secret.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BillingApi for BillingClient {
    async fn costs(&self, start: CalendarDay, end: CalendarDay) -> Result<BillingResponse> {
        if start > end {
            return Err(ConfcostError::Config(format!(
                "billing window start {start} is after end {end}"
            )));
        }

        let response = self
            .client
            .get(format!("{}/billing/v1/costs", self.endpoint))
            .query(&[
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
            ])
            .basic_auth(&self.api_key_id, Some(&self.api_key_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConfcostError::Api {
                status: response.status().as_u16(),
                context: "billing API",
            });
        }

        Ok(response.json().await?)
    }
}
