//! Canonical run status normalization.
//!
//! ComfyDeploy's status vocabulary is not stable across job types --
//! `success`, `completed`, and `succeeded` have all been observed on
//! finished runs, and sometimes the status field lags behind the outputs.
//! This module folds whatever the API reports into the small set of states
//! the rest of the system reasons about.

use serde::{Deserialize, Serialize};

/// Raw status values ComfyDeploy uses for a finished run.
pub const SUCCESS_SYNONYMS: &[&str] = &["success", "completed", "succeeded"];

/// Normalized lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Queued,
    Running,
    Success,
    Failed,
    /// The status fetch itself failed. Produced by callers, never by
    /// [`normalize_status`].
    ApiError,
}

impl CanonicalStatus {
    /// Wire value, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Queued => "queued",
            CanonicalStatus::Running => "running",
            CanonicalStatus::Success => "success",
            CanonicalStatus::Failed => "failed",
            CanonicalStatus::ApiError => "api_error",
        }
    }

    /// A run in a terminal state will never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, CanonicalStatus::Success | CanonicalStatus::Failed)
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold a raw status string plus output presence into a [`CanonicalStatus`].
///
/// Rules, in order:
///
/// 1. `failed` is terminal no matter what else the payload claims.
/// 2. Any success synonym OR a resolvable output URL means `Success` --
///    output presence dominates a stale in-progress status field.
/// 3. `queued` / `not-started` map to `Queued`.
/// 4. Everything else (including an absent status) is treated as still
///    running; the raw string is echoed to callers separately, so nothing
///    is lost by the coarse mapping.
pub fn normalize_status(raw: Option<&str>, has_output_url: bool) -> CanonicalStatus {
    match raw {
        Some("failed") => CanonicalStatus::Failed,
        Some(s) if SUCCESS_SYNONYMS.contains(&s) => CanonicalStatus::Success,
        _ if has_output_url => CanonicalStatus::Success,
        Some("queued") | Some("not-started") => CanonicalStatus::Queued,
        _ => CanonicalStatus::Running,
    }
}
