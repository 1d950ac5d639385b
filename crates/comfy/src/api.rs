//! HTTP client for the ComfyDeploy API.
//!
//! Wraps the two endpoints this system uses (queue a deployment run, fetch
//! run status) using [`reqwest`], with bearer authentication.

use async_trait::async_trait;
use serde_json::Value;

use crate::payload::RunPayload;
use crate::GenerationApi;

/// Default API base when `COMFY_API_BASE` is not overridden.
pub const DEFAULT_API_BASE: &str = "https://api.comfydeploy.com";

/// HTTP client for the ComfyDeploy REST API.
pub struct ComfyDeployApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    deployment_id: String,
}

/// Errors from the ComfyDeploy REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyDeploy returned a non-2xx status code.
    #[error("ComfyDeploy API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// ComfyDeploy answered 200 but with an unusable shape.
    #[error("ComfyDeploy protocol error: {0}")]
    Protocol(String),
}

impl ComfyDeployApi {
    /// Create a new API client.
    ///
    /// * `base_url`      - API base, e.g. `https://api.comfydeploy.com`.
    /// * `api_key`       - bearer credential.
    /// * `deployment_id` - the deployed workflow runs are queued against.
    pub fn new(base_url: String, api_key: String, deployment_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            deployment_id,
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComfyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationApi for ComfyDeployApi {
    /// Queue a run of the configured deployment.
    ///
    /// Sends `POST /api/run/deployment/queue` with the workflow inputs.
    /// A 200 response without a usable `run_id` is a protocol error --
    /// the run may or may not exist upstream, but we cannot track it.
    async fn queue_run(&self, inputs: &Value) -> Result<String, ComfyApiError> {
        let body = serde_json::json!({
            "deployment_id": self.deployment_id,
            "inputs": inputs,
        });

        let response = self
            .client
            .post(format!("{}/api/run/deployment/queue", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let data: Value = Self::parse_response(response).await?;
        match data.get("run_id").and_then(Value::as_str) {
            Some(run_id) if !run_id.is_empty() => Ok(run_id.to_string()),
            _ => Err(ComfyApiError::Protocol(
                "queue response carried no 'run_id'".to_string(),
            )),
        }
    }

    /// Fetch the raw status payload for a run.
    ///
    /// Sends `GET /api/run/{run_id}`. The payload shape varies across
    /// workflow versions; see [`RunPayload`].
    async fn fetch_run(&self, run_id: &str) -> Result<RunPayload, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/api/run/{}", self.base_url, run_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
