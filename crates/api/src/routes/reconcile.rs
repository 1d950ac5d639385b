//! Route definition for the reconciliation sweep trigger.
//!
//! ```text
//! GET /reconcile
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::reconcile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/reconcile", get(reconcile::run_sweep))
}
