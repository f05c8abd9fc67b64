use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::analysis::AnalysisResult;
use crate::pipeline::{AnalyzeOutcome, ComponentsOutcome};

/// Client for a running component-forge server.
pub struct ForgeClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

impl ForgeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn analyze(&self, url: &str) -> Result<AnalyzeOutcome> {
        self.post("/api/analyze", &json!({ "url": url })).await
    }

    pub async fn generate_components(&self, analysis: &AnalysisResult) -> Result<ComponentsOutcome> {
        self.post("/api/generate-components", &json!({ "analysis": analysis }))
            .await
    }

    async fn post<B, O>(&self, path: &str, body: &B) -> Result<O>
    where
        B: Serialize,
        O: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {url} failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error = resp
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Server returned {status}: {error}"));
        }

        resp.json()
            .await
            .map_err(|e| anyhow!("Failed to decode response from {url}: {e}"))
    }
}
