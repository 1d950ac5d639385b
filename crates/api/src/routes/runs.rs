//! Route definitions for run submission and status queries.
//!
//! ```text
//! POST /runs
//! GET  /runs/{run_id}/status
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/runs", post(runs::submit_run))
        .route("/runs/{run_id}/status", get(runs::get_status))
}
