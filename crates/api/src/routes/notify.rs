//! Route definition for direct notification dispatch.
//!
//! ```text
//! POST /notify
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::notify;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notify", post(notify::send_notification))
}
