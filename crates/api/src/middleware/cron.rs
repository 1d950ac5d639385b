//! Shared-secret extractor for the reconciliation-sweep trigger.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use rockstar_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Authorizes the external cron trigger via `Authorization: Bearer <secret>`.
///
/// Use this as an extractor parameter on any handler only the scheduled
/// trigger may invoke:
///
/// ```ignore
/// async fn run_sweep(_auth: CronAuth, State(state): State<AppState>) -> AppResult<Json<...>> {
///     ...
/// }
/// ```
///
/// An unconfigured `CRON_SECRET` also rejects with 401 -- there is no
/// anonymous fallback for the trigger.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = state.config.cron_secret.as_deref().ok_or_else(|| {
            tracing::warn!("Sweep trigger rejected: CRON_SECRET is not configured");
            AppError::Core(CoreError::Unauthorized("Unauthorized".into()))
        })?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <secret>".into(),
            ))
        })?;

        if token != secret {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid cron secret".into(),
            )));
        }

        Ok(CronAuth)
    }
}
