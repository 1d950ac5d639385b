//! Handlers for run submission and status queries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::ValidateEmail;

use rockstar_core::error::CoreError;
use rockstar_core::scene::Scene;
use rockstar_core::status::CanonicalStatus;
use rockstar_kv::RunRecord;
use rockstar_pipeline::{DeliveryGuard, RunWatcher};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /runs`. The image is a base64 data-URL payload and is
/// forwarded opaque to the generation workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitRunRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitRunResponse {
    pub run_id: String,
}

/// Body for `GET /runs/{run_id}/status`.
///
/// `raw_status` echoes the upstream status string for inspection;
/// `email_triggered`/`email_reason` report the interactive watcher's
/// delivery-guard outcome when this run is the one being watched.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub live_status: Option<String>,
    pub status: CanonicalStatus,
    pub outputs: Vec<Value>,
    pub progress: Option<f64>,
    pub queue_position: Option<i64>,
    pub raw_status: Option<String>,
    pub output_url: Option<String>,
    pub email_triggered: bool,
    pub email_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /runs
// ---------------------------------------------------------------------------

/// Queue a new generation run and start tracking it.
pub async fn submit_run(
    State(state): State<AppState>,
    Json(body): Json<SubmitRunRequest>,
) -> AppResult<impl IntoResponse> {
    if body.image.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Missing 'image' in payload".into(),
        )));
    }

    let scene: Option<Scene> = body
        .scene
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
        .map_err(AppError::Core)?;

    let email = body.email.trim().to_string();
    if !email.is_empty() && !email.validate_email() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid email address: {email}"
        ))));
    }

    let generation = state.generation()?;

    // Exactly the inputs the deployed workflow consumes.
    let inputs = json!({
        "nombre": body.name,
        "apellido": body.surname,
        "imagen": body.image,
        "escena": scene.map(Scene::as_str),
        "email": email,
    });

    let run_id = generation.queue_run(&inputs).await?;
    tracing::info!(run_id = %run_id, scene = ?scene, "Generation run queued");

    // Bookkeeping is best-effort: the run is already queued upstream, so
    // the caller gets its id even when tracking misses this run.
    let record = RunRecord {
        name: body.name,
        surname: body.surname,
        email,
        scene: scene.map(|s| s.as_str().to_string()).unwrap_or_default(),
        created_at: Some(Utc::now()),
    };
    if let Err(e) = state.store.record_run(&run_id, &record).await {
        tracing::warn!(run_id = %run_id, error = %e, "Failed to record run for tracking");
    }

    // Start the interactive watcher; a new submission supersedes whatever
    // run was being watched before.
    match state.mailer() {
        Ok(mailer) => {
            let guard = DeliveryGuard::new(state.store.clone(), mailer);
            let watcher = RunWatcher::new(
                generation,
                state.store.clone(),
                guard,
                state.config.watcher.clone(),
            );
            state.watch_slot.replace(watcher.spawn(run_id.clone()));
        }
        Err(_) => {
            tracing::warn!(
                run_id = %run_id,
                "RESEND_API_KEY not set; interactive delivery disabled for this run"
            );
        }
    }

    Ok(Json(SubmitRunResponse { run_id }))
}

// ---------------------------------------------------------------------------
// GET /runs/{run_id}/status
// ---------------------------------------------------------------------------

/// Query a run's normalized status.
///
/// A failed upstream fetch answers 502 with `status: "api_error"` so the
/// UI has a single field to key its rendering on.
pub async fn get_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Response> {
    let generation = state.generation()?;

    match generation.fetch_run(&run_id).await {
        Ok(payload) => {
            let (status, output_url) = payload.normalized();

            let (email_triggered, email_reason) = state
                .watch_slot
                .subscribe(&run_id)
                .map(|rx| {
                    let snapshot = rx.borrow();
                    (snapshot.email_triggered, snapshot.email_reason.clone())
                })
                .unwrap_or((false, None));

            Ok(Json(StatusResponse {
                live_status: payload.live_status.clone(),
                status,
                outputs: payload.outputs.clone(),
                progress: payload.progress,
                queue_position: payload.queue_position,
                raw_status: payload.status.clone(),
                output_url,
                email_triggered,
                email_reason,
            })
            .into_response())
        }
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Status fetch failed");
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(StatusResponse {
                    live_status: Some(e.to_string()),
                    status: CanonicalStatus::ApiError,
                    outputs: Vec::new(),
                    progress: None,
                    queue_position: None,
                    raw_status: None,
                    output_url: None,
                    email_triggered: false,
                    email_reason: None,
                }),
            )
                .into_response())
        }
    }
}
