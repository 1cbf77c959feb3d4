//! Durable artifact storage
//!
//! The exporter only needs `put(bucket, key, bytes)`. Production talks to an
//! S3-compatible HTTP gateway; tests use in-memory stores implementing the
//! same trait.

use async_trait::async_trait;

use crate::error::{ConfcostError, Result};

/// Seam between the scheduler and durable storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `key` in `bucket`, overwriting any previous object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Artifact store backed by an S3-compatible HTTP gateway: objects are
/// created with `PUT {endpoint}/{bucket}/{key}`.
pub struct HttpArtifactStore {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    /// Create a store client against a gateway base URL, with an optional
    /// bearer token.
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut request = self
            .client
            .put(format!("{}/{}/{}", self.endpoint, bucket, key))
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConfcostError::Api {
                status: response.status().as_u16(),
                context: "artifact store",
            });
        }
        Ok(())
    }
}
