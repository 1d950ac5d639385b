use std::sync::Arc;

use rockstar_comfy::GenerationApi;
use rockstar_kv::RunStore;
use rockstar_mailer::Mailer;
use rockstar_pipeline::WatchSlot;

use crate::config::ServerConfig;
use crate::error::AppError;
use rockstar_core::error::CoreError;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// Collaborator clients are `None` when their credentials are absent; the
/// accessor methods turn that into a call-time configuration error.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Run bookkeeping over the durable store.
    pub store: RunStore,
    /// Generation-service client, when configured.
    pub generation: Option<Arc<dyn GenerationApi>>,
    /// Email dispatcher, when configured.
    pub mailer: Option<Arc<dyn Mailer>>,
    /// The single active interactive run watcher.
    pub watch_slot: WatchSlot,
}

impl AppState {
    /// Generation-service client, or a 500 configuration error naming the
    /// missing variable.
    pub fn generation(&self) -> Result<Arc<dyn GenerationApi>, AppError> {
        self.generation.clone().ok_or_else(|| {
            let var = if self.config.comfy_api_key.is_none() {
                "COMFY_API_KEY"
            } else {
                "COMFY_DEPLOYMENT_ID"
            };
            AppError::Core(CoreError::Configuration(var))
        })
    }

    /// Email dispatcher, or a 500 configuration error.
    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, AppError> {
        self.mailer
            .clone()
            .ok_or(AppError::Core(CoreError::Configuration("RESEND_API_KEY")))
    }
}
