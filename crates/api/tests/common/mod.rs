//! Shared harness for API integration tests.
//!
//! Builds the full router + middleware stack the way `main.rs` does, with
//! the external collaborators replaced by scriptable fakes injected
//! through the trait seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use rockstar_api::config::ServerConfig;
use rockstar_api::router::build_app_router;
use rockstar_api::state::AppState;
use rockstar_comfy::{ComfyApiError, GenerationApi, RunPayload};
use rockstar_kv::{MemoryKv, RunRecord, RunStore};
use rockstar_mailer::{Mailer, MailerError, NotifyRequest, SendReport, SentEmail};
use rockstar_pipeline::{WatchSlot, WatcherConfig};

// ---------------------------------------------------------------------------
// Collaborator fakes
// ---------------------------------------------------------------------------

/// Scriptable generation service: per-run payloads or errors.
#[derive(Default)]
pub struct ScriptedGeneration {
    queued_run_id: Mutex<Option<String>>,
    runs: Mutex<HashMap<String, Result<RunPayload, String>>>,
}

impl ScriptedGeneration {
    /// Queue answers with this run id ("abc123" by default).
    pub fn queue_returns(&self, run_id: &str) {
        *self.queued_run_id.lock().unwrap() = Some(run_id.to_string());
    }

    /// Queue answers 200 without a run id (protocol error).
    pub fn queue_returns_no_run_id(&self) {
        *self.queued_run_id.lock().unwrap() = None;
    }

    pub fn running(&self, run_id: &str) {
        self.runs.lock().unwrap().insert(
            run_id.to_string(),
            Ok(RunPayload {
                status: Some("running".to_string()),
                live_status: Some("KSampler".to_string()),
                progress: Some(0.4),
                ..Default::default()
            }),
        );
    }

    pub fn succeed_with_url(&self, run_id: &str, url: &str) {
        self.runs.lock().unwrap().insert(
            run_id.to_string(),
            Ok(RunPayload {
                status: Some("succeeded".to_string()),
                outputs: vec![serde_json::json!({ "url": url })],
                ..Default::default()
            }),
        );
    }

    pub fn fail_fetch(&self, run_id: &str, message: &str) {
        self.runs
            .lock()
            .unwrap()
            .insert(run_id.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl GenerationApi for ScriptedGeneration {
    async fn queue_run(&self, _inputs: &serde_json::Value) -> Result<String, ComfyApiError> {
        match self.queued_run_id.lock().unwrap().clone() {
            Some(run_id) => Ok(run_id),
            None => Err(ComfyApiError::Protocol(
                "queue response carried no 'run_id'".to_string(),
            )),
        }
    }

    async fn fetch_run(&self, run_id: &str) -> Result<RunPayload, ComfyApiError> {
        match self.runs.lock().unwrap().get(run_id) {
            Some(Ok(payload)) => Ok(payload.clone()),
            Some(Err(message)) => Err(ComfyApiError::Api {
                status: 500,
                body: message.clone(),
            }),
            None => Err(ComfyApiError::Api {
                status: 404,
                body: format!("unknown run {run_id}"),
            }),
        }
    }
}

/// Mailer that records every notification and always succeeds.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<NotifyRequest>>,
}

impl RecordingMailer {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.email.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_run_ready(&self, request: &NotifyRequest) -> Result<SendReport, MailerError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(SendReport {
            results: vec![SentEmail {
                to: request.email.clone(),
                id: Some("fake-id".to_string()),
            }],
            attached: false,
        })
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// The shared secret `test_config` installs for the sweep trigger.
pub const TEST_CRON_SECRET: &str = "test-secret";

/// Build a test `ServerConfig` with safe defaults.
///
/// The watcher is limited to a single immediate tick (`max_watch` = 0) so
/// background polling never races test assertions.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfy_api_key: Some("test-comfy-key".to_string()),
        comfy_api_base: "http://comfy.invalid".to_string(),
        comfy_deployment_id: Some("test-deployment".to_string()),
        resend_api_key: Some("test-resend-key".to_string()),
        resend_api_base: "http://resend.invalid".to_string(),
        from_email: "Test <test@example.com>".to_string(),
        admin_email: "admin@example.com".to_string(),
        cron_secret: Some(TEST_CRON_SECRET.to_string()),
        kv_rest_url: None,
        kv_rest_token: None,
        app_url: None,
        watcher: WatcherConfig {
            poll_interval: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            max_watch: Duration::ZERO,
        },
    }
}

/// A fully wired test application plus handles on its collaborators.
pub struct TestApp {
    pub app: Router,
    pub store: RunStore,
    pub generation: Arc<ScriptedGeneration>,
    pub mailer: Arc<RecordingMailer>,
}

/// Build the application with scriptable fakes for every collaborator.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = RunStore::new(Arc::new(MemoryKv::new()));
    let generation = Arc::new(ScriptedGeneration::default());
    generation.queue_returns("abc123");
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState {
        config: Arc::new(config.clone()),
        store: store.clone(),
        generation: Some(generation.clone()),
        mailer: Some(mailer.clone()),
        watch_slot: WatchSlot::new(),
    };

    TestApp {
        app: build_app_router(state, &config),
        store,
        generation,
        mailer,
    }
}

/// Build the application with NO collaborator credentials configured.
pub fn build_unconfigured_app() -> TestApp {
    let mut config = test_config();
    config.comfy_api_key = None;
    config.comfy_deployment_id = None;
    config.resend_api_key = None;

    let store = RunStore::new(Arc::new(MemoryKv::new()));
    let state = AppState {
        config: Arc::new(config.clone()),
        store: store.clone(),
        generation: None,
        mailer: None,
        watch_slot: WatchSlot::new(),
    };

    TestApp {
        app: build_app_router(state, &config),
        store,
        generation: Arc::new(ScriptedGeneration::default()),
        mailer: Arc::new(RecordingMailer::default()),
    }
}

/// Seed the store with Ana's pending run.
pub async fn seed_ana(store: &RunStore, run_id: &str) {
    store
        .record_run(
            run_id,
            &RunRecord {
                name: "Ana".to_string(),
                surname: "Diaz".to_string(),
                email: "ana@example.com".to_string(),
                scene: "guitarra".to_string(),
                created_at: None,
            },
        )
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get_with_bearer(app: Router, uri: &str, token: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the response carries the expected status and return its JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
