//! Shared collaborator fakes for the workflow unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rockstar_comfy::{ComfyApiError, GenerationApi, RunPayload};
use rockstar_kv::{MemoryKv, RunStore};
use rockstar_mailer::{Mailer, MailerError, NotifyRequest, SendReport, SentEmail};

pub fn store_with_memory_kv() -> RunStore {
    RunStore::new(Arc::new(MemoryKv::new()))
}

/// Mailer that records every request and always succeeds.
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

/// Mailer that fails its first N sends, then succeeds.
pub struct FlakyMailer {
    remaining_failures: AtomicUsize,
}

impl FlakyMailer {
    pub fn failing_first(n: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl Mailer for FlakyMailer {
    async fn send_run_ready(&self, request: &NotifyRequest) -> Result<SendReport, MailerError> {
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(MailerError::Api {
                status: 500,
                body: "provider unavailable".to_string(),
            });
        }
        Ok(SendReport {
            results: vec![SentEmail {
                to: request.email.clone(),
                id: Some("fake-id".to_string()),
            }],
            attached: false,
        })
    }
}

/// Scripted upstream: per-run payloads or errors, plus a call counter.
#[derive(Default)]
pub struct ScriptedGeneration {
    runs: Mutex<HashMap<String, Vec<Result<RunPayload, String>>>>,
    fetch_count: AtomicUsize,
}

impl ScriptedGeneration {
    /// Every fetch for `run_id` pops the next scripted step; the last step
    /// repeats once the script is exhausted.
    pub fn script(&self, run_id: &str, steps: Vec<Result<RunPayload, String>>) {
        self.runs.lock().unwrap().insert(run_id.to_string(), steps);
    }

    pub fn succeed_with_url(&self, run_id: &str, url: &str) {
        self.script(
            run_id,
            vec![Ok(RunPayload {
                status: Some("succeeded".to_string()),
                outputs: vec![serde_json::json!({ "url": url })],
                ..Default::default()
            })],
        );
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationApi for ScriptedGeneration {
    async fn queue_run(&self, _inputs: &serde_json::Value) -> Result<String, ComfyApiError> {
        Ok("scripted-run".to_string())
    }

    async fn fetch_run(&self, run_id: &str) -> Result<RunPayload, ComfyApiError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let mut runs = self.runs.lock().unwrap();
        let steps = runs
            .get_mut(run_id)
            .ok_or_else(|| ComfyApiError::Api {
                status: 404,
                body: format!("no script for {run_id}"),
            })?;
        let step = if steps.len() > 1 {
            steps.remove(0)
        } else {
            steps[0].clone()
        };
        step.map_err(|message| ComfyApiError::Api {
            status: 500,
            body: message,
        })
    }
}
