//! Handler for the cron-triggered reconciliation sweep.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use rockstar_pipeline::{DeliveryGuard, Reconciler};

use crate::error::AppResult;
use crate::middleware::cron::CronAuth;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /reconcile
// ---------------------------------------------------------------------------

/// Re-check every pending run and advance the terminal ones.
///
/// Requires the cron shared secret. Both collaborator credentials are
/// checked up front -- a sweep that cannot fetch statuses or deliver
/// email must not half-process the pending set.
pub async fn run_sweep(_auth: CronAuth, State(state): State<AppState>) -> AppResult<Response> {
    let generation = state.generation()?;
    let mailer = state.mailer()?;

    let guard = DeliveryGuard::new(state.store.clone(), mailer);
    let reconciler = Reconciler::new(state.store.clone(), generation, guard);

    let summary = reconciler.run_sweep().await?;
    if summary.total_checked == 0 {
        return Ok(Json(json!({ "message": "No pending runs" })).into_response());
    }

    Ok(Json(summary).into_response())
}
