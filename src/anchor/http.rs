//! HTTP Anchor Client
//!
//! Publishes hashes to a remote anchoring service and reads back the
//! published sequence.
//!
//! - `POST {base}/anchors` with body `{"hash": "<hex>"}`
//! - `GET {base}/anchors[?limit=n]` returning `{"hashes": [...]}`, oldest first

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::anchor::AnchorAdapter;
use crate::error::{ChainLogError, Result};

#[derive(Debug, Serialize)]
struct AnchorRequest<'a> {
    hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnchorListResponse {
    hashes: Vec<String>,
}

/// Client for a remote anchoring service
#[derive(Clone)]
pub struct HttpAnchor {
    base_url: String,
    http_client: Client,
}

impl HttpAnchor {
    /// Create new anchor client for `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainLogError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn anchors_url(&self) -> String {
        format!("{}/anchors", self.base_url)
    }
}

#[async_trait]
impl AnchorAdapter for HttpAnchor {
    async fn write(&self, hash: &str) -> Result<()> {
        debug!("Publishing anchor {} to {}", hash, self.base_url);

        let response = self
            .http_client
            .post(self.anchors_url())
            .json(&AnchorRequest { hash })
            .send()
            .await
            .map_err(|e| ChainLogError::AnchorWrite(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainLogError::AnchorWrite(format!(
                "Anchor service returned {}",
                status
            )));
        }

        info!("Anchored {}", hash);
        Ok(())
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let mut request = self.http_client.get(self.anchors_url());
        if let Some(n) = limit {
            request = request.query(&[("limit", n)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChainLogError::AnchorRead(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainLogError::AnchorRead(format!(
                "Anchor service returned {}",
                status
            )));
        }

        let body: AnchorListResponse = response
            .json()
            .await
            .map_err(|e| ChainLogError::AnchorRead(format!("Invalid anchor list: {}", e)))?;

        debug!("Read {} anchors from {}", body.hashes.len(), self.base_url);
        Ok(body.hashes)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
