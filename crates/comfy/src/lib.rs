//! REST client for the ComfyDeploy generation service.
//!
//! The service is an opaque job queue: submit a deployment run, poll its
//! status. [`GenerationApi`] is the seam the workflow code programs
//! against; [`ComfyDeployApi`] is the real client.

pub mod api;
pub mod payload;

use async_trait::async_trait;

pub use api::{ComfyApiError, ComfyDeployApi};
pub use payload::RunPayload;

/// The generation-service operations the workflow needs.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Queue a new run with the given workflow inputs; returns the
    /// server-assigned run id.
    async fn queue_run(&self, inputs: &serde_json::Value) -> Result<String, ComfyApiError>;

    /// Fetch the raw status payload for a run.
    async fn fetch_run(&self, run_id: &str) -> Result<RunPayload, ComfyApiError>;
}
