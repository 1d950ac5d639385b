use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rockstar_api::config::ServerConfig;
use rockstar_api::router::build_app_router;
use rockstar_api::state::AppState;
use rockstar_comfy::{ComfyDeployApi, GenerationApi};
use rockstar_kv::{KvStore, MemoryKv, RestKv, RunStore};
use rockstar_mailer::{Mailer, ResendMailer};
use rockstar_pipeline::WatchSlot;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rockstar_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Durable store ---
    let kv: Arc<dyn KvStore> = match (&config.kv_rest_url, &config.kv_rest_token) {
        (Some(url), Some(token)) => {
            tracing::info!(url = %url, "Using KV REST store");
            Arc::new(RestKv::new(url.clone(), token.clone()))
        }
        _ => {
            tracing::warn!(
                "KV_REST_API_URL/KV_REST_API_TOKEN not set; using in-memory store \
                 (run tracking will not survive restarts)"
            );
            Arc::new(MemoryKv::new())
        }
    };
    let store = RunStore::new(kv);

    // --- Collaborator clients (credentials are re-checked at call time) ---
    let generation: Option<Arc<dyn GenerationApi>> =
        match (&config.comfy_api_key, &config.comfy_deployment_id) {
            (Some(key), Some(deployment_id)) => Some(Arc::new(ComfyDeployApi::new(
                config.comfy_api_base.clone(),
                key.clone(),
                deployment_id.clone(),
            ))),
            _ => {
                tracing::warn!("COMFY_API_KEY/COMFY_DEPLOYMENT_ID not set; generation disabled");
                None
            }
        };

    let mailer: Option<Arc<dyn Mailer>> = match &config.resend_api_key {
        Some(key) => Some(Arc::new(ResendMailer::new(
            config.resend_api_base.clone(),
            key.clone(),
            config.from_email.clone(),
            config.admin_email.clone(),
            config.app_url.clone(),
        ))),
        None => {
            tracing::warn!("RESEND_API_KEY not set; email delivery disabled");
            None
        }
    };

    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set; the reconciliation sweep trigger will refuse");
    }

    // --- App state ---
    let watch_slot = WatchSlot::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        generation,
        mailer,
        watch_slot: watch_slot.clone(),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(handle) = watch_slot.shutdown() {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle.join()).await;
        tracing::info!("Run watcher stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
