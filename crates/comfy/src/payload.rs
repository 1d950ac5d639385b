//! Raw run-status payload and its normalization bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rockstar_core::outputs::extract_output_url;
use rockstar_core::status::{normalize_status, CanonicalStatus};

/// The run-status payload as ComfyDeploy reports it.
///
/// Every field is optional on the wire; `outputs` elements are kept as raw
/// JSON because their shape varies across workflow versions (the URL may
/// sit at any of four known locations -- see
/// [`rockstar_core::outputs::extract_output_url`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPayload {
    #[serde(default)]
    pub live_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub outputs: Vec<Value>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub queue_position: Option<i64>,
}

impl RunPayload {
    /// Canonical status plus the best candidate output URL.
    pub fn normalized(&self) -> (CanonicalStatus, Option<String>) {
        let url = extract_output_url(&self.outputs);
        let status = normalize_status(self.status.as_deref(), url.is_some());
        (status, url)
    }
}
