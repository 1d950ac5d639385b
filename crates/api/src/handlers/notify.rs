//! Handler for direct notification dispatch.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use rockstar_core::error::CoreError;
use rockstar_mailer::{NotifyRequest, SentEmail};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub success: bool,
    /// False when the image could not be attached and the email carries
    /// the download link instead.
    pub attached: bool,
    pub results: Vec<SentEmail>,
}

// ---------------------------------------------------------------------------
// POST /notify
// ---------------------------------------------------------------------------

/// Send the run-ready notification (requester + admin copy).
///
/// The attachment is best-effort; only a failed send call is an error.
pub async fn send_notification(
    State(state): State<AppState>,
    Json(body): Json<NotifyRequest>,
) -> AppResult<impl IntoResponse> {
    if body.image_url.trim().is_empty() || body.email.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Missing required fields: image_url or email".into(),
        )));
    }

    let mailer = state.mailer()?;
    let report = mailer.send_run_ready(&body).await?;

    tracing::info!(to = %body.email, attached = report.attached, "Notification emails sent");

    Ok(Json(NotifyResponse {
        success: true,
        attached: report.attached,
        results: report.results,
    }))
}
