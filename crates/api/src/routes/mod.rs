pub mod health;
pub mod notify;
pub mod reconcile;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /runs                      submit a generation run (POST)
/// /runs/{run_id}/status      normalized status query (GET)
///
/// /notify                    send the run-ready notification (POST)
///
/// /reconcile                 reconciliation sweep, cron secret required (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(runs::router())
        .merge(notify::router())
        .merge(reconcile::router())
}
