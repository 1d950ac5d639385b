//! Notification email dispatch.
//!
//! Composition is pure ([`compose`]); delivery goes through a
//! Resend-compatible HTTP API ([`resend`]). The image attachment is
//! best-effort: when the fetch fails the email carries a download link
//! instead, and that still counts as a successful dispatch.

pub mod compose;
pub mod resend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use resend::ResendMailer;

/// A notification request: who to mail about which generated image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyRequest {
    /// URL of the generated image.
    pub image_url: String,
    /// Requester address.
    pub email: String,
    /// Combined display name; wins over the separate fields when present.
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub scene: Option<String>,
}

/// One provider acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct SentEmail {
    pub to: String,
    /// Provider-assigned message id, when the provider reported one.
    pub id: Option<String>,
}

/// Outcome of a dispatched notification (requester + admin copy).
#[derive(Debug, Clone, Serialize)]
pub struct SendReport {
    pub results: Vec<SentEmail>,
    /// Whether the image went out as an attachment (false = link fallback).
    pub attached: bool,
}

/// Errors from the email provider boundary.
///
/// A degraded attachment is NOT an error; only the send call itself
/// failing is.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider rejected the send.
    #[error("Email provider error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// The dispatcher seam the workflow code programs against.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the "your image is ready" notification to the requester plus
    /// the admin copy. Returns per-recipient provider ids.
    async fn send_run_ready(&self, request: &NotifyRequest) -> Result<SendReport, MailerError>;
}
