use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use rockstar_comfy::ComfyApiError;
use rockstar_core::error::CoreError;
use rockstar_kv::KvError;
use rockstar_mailer::MailerError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors plus the collaborator-boundary
/// errors. Implements [`IntoResponse`] to produce consistent JSON error
/// responses; secrets and raw internal detail never reach the body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rockstar_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from the ComfyDeploy boundary.
    #[error("Generation service error: {0}")]
    Upstream(#[from] ComfyApiError),

    /// An error from the email provider boundary.
    #[error("Email delivery error: {0}")]
    Delivery(#[from] MailerError),

    /// An error from the durable store boundary.
    #[error("Store error: {0}")]
    Store(#[from] KvError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Configuration(var) => {
                    tracing::error!(var, "Missing configuration");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CONFIGURATION_ERROR",
                        format!("Server misconfiguration ({var})"),
                    )
                }
                CoreError::UpstreamProtocol(msg) => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_PROTOCOL_ERROR",
                    msg.clone(),
                ),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Collaborator boundaries ---
            AppError::Upstream(err) => classify_upstream_error(err),
            AppError::Delivery(err) => {
                tracing::error!(error = %err, "Email delivery failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DELIVERY_ERROR",
                    "Failed to send email".to_string(),
                )
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Durable store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Durable store is unavailable".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a ComfyDeploy error into an HTTP status, error code, and message.
///
/// Everything maps to 502: the caller's request was fine, the upstream
/// collaborator was not. The upstream status code is preserved in the
/// message for debuggability.
fn classify_upstream_error(err: &ComfyApiError) -> (StatusCode, &'static str, String) {
    match err {
        ComfyApiError::Request(e) => {
            tracing::error!(error = %e, "Generation service unreachable");
            (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                "Generation service unreachable".to_string(),
            )
        }
        ComfyApiError::Api { status, body } => {
            tracing::error!(upstream_status = status, body = %body, "Generation service error");
            (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                format!("Generation service returned {status}"),
            )
        }
        ComfyApiError::Protocol(msg) => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_PROTOCOL_ERROR",
            msg.clone(),
        ),
    }
}
