//! Reconciliation sweep over the pending set.
//!
//! Covers runs whose owning session is no longer polling. One run's
//! failure never aborts the batch: a failed status fetch leaves the run
//! pending for the next sweep, and a failed notification is logged while
//! the run still completes its bookkeeping transition.

use std::sync::Arc;

use serde::Serialize;

use rockstar_comfy::GenerationApi;
use rockstar_core::status::CanonicalStatus;
use rockstar_kv::{KvError, RunStore};
use rockstar_mailer::NotifyRequest;

use crate::guard::DeliveryGuard;

/// One run's failure inside a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepError {
    pub run_id: String,
    pub error: String,
}

/// Batch result reported to the cron trigger.
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub total_checked: usize,
    pub errors: Vec<SweepError>,
}

/// The cron-triggered reconciliation pass.
pub struct Reconciler {
    store: RunStore,
    generation: Arc<dyn GenerationApi>,
    guard: DeliveryGuard,
}

impl Reconciler {
    pub fn new(store: RunStore, generation: Arc<dyn GenerationApi>, guard: DeliveryGuard) -> Self {
        Self {
            store,
            generation,
            guard,
        }
    }

    /// Re-check every pending run and advance the terminal ones.
    ///
    /// Runs are handled sequentially, one at a time; errors are isolated
    /// per run. Only reading the pending set itself can fail the sweep as
    /// a whole.
    pub async fn run_sweep(&self) -> Result<SweepSummary, KvError> {
        let pending = self.store.pending_runs().await?;

        let mut summary = SweepSummary {
            total_checked: pending.len(),
            ..Default::default()
        };

        for run_id in &pending {
            self.reconcile_run(run_id, &mut summary).await;
        }

        tracing::info!(
            total_checked = summary.total_checked,
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            errors = summary.errors.len(),
            "Reconciliation sweep finished"
        );

        Ok(summary)
    }

    async fn reconcile_run(&self, run_id: &str, summary: &mut SweepSummary) {
        let payload = match self.generation.fetch_run(run_id).await {
            Ok(payload) => payload,
            Err(e) => {
                // Not removed from pending: retried on the next sweep.
                tracing::error!(run_id, error = %e, "Status fetch failed during sweep");
                summary.errors.push(SweepError {
                    run_id: run_id.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let (status, output_url) = payload.normalized();
        match status {
            CanonicalStatus::Success => {
                self.deliver_and_clean_up(run_id, output_url, summary).await;
                summary.completed.push(run_id.to_string());
            }
            CanonicalStatus::Failed => {
                tracing::warn!(run_id, "Run failed upstream");
                if let Err(e) = self.store.remove_pending(run_id).await {
                    tracing::error!(run_id, error = %e, "Failed to drop failed run from pending set");
                    summary.errors.push(SweepError {
                        run_id: run_id.to_string(),
                        error: e.to_string(),
                    });
                }
                // Record hash retained on purpose, for later inspection.
                summary.failed.push(run_id.to_string());
            }
            _ => {
                tracing::debug!(run_id, status = %status, "Run still in progress");
            }
        }
    }

    /// Notification attempt first, bookkeeping transition second -- the
    /// pending-set removal and record deletion must not happen while the
    /// attempt is unresolved.
    async fn deliver_and_clean_up(
        &self,
        run_id: &str,
        output_url: Option<String>,
        summary: &mut SweepSummary,
    ) {
        match self.store.run_record(run_id).await {
            Ok(Some(record)) if !record.email.is_empty() && output_url.is_some() => {
                let request = NotifyRequest {
                    image_url: output_url.unwrap_or_default(),
                    email: record.email,
                    name: Some(record.name),
                    surname: Some(record.surname),
                    scene: Some(record.scene),
                    ..Default::default()
                };
                let outcome = self.guard.attempt(run_id, &request).await;
                if !outcome.sent {
                    tracing::warn!(run_id, reason = %outcome.reason, "Sweep did not deliver");
                }
            }
            Ok(record) => {
                tracing::warn!(
                    run_id,
                    has_record = record.is_some(),
                    has_output_url = output_url.is_some(),
                    "Run succeeded but notification is undeliverable"
                );
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "Record lookup failed during sweep");
                summary.errors.push(SweepError {
                    run_id: run_id.to_string(),
                    error: e.to_string(),
                });
            }
        }

        if let Err(e) = self.store.remove_pending(run_id).await {
            tracing::error!(run_id, error = %e, "Failed to drop completed run from pending set");
            summary.errors.push(SweepError {
                run_id: run_id.to_string(),
                error: e.to_string(),
            });
        }
        if let Err(e) = self.store.delete_record(run_id).await {
            tracing::error!(run_id, error = %e, "Failed to delete completed run record");
            summary.errors.push(SweepError {
                run_id: run_id.to_string(),
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::{store_with_memory_kv, RecordingMailer, ScriptedGeneration};
    use rockstar_comfy::RunPayload;
    use rockstar_kv::RunRecord;

    fn record(email: &str) -> RunRecord {
        RunRecord {
            name: "Ana".to_string(),
            surname: "Diaz".to_string(),
            email: email.to_string(),
            scene: "guitarra".to_string(),
            created_at: None,
        }
    }

    fn reconciler(
        store: &RunStore,
        generation: &Arc<ScriptedGeneration>,
        mailer: &Arc<RecordingMailer>,
    ) -> Reconciler {
        Reconciler::new(
            store.clone(),
            generation.clone(),
            DeliveryGuard::new(store.clone(), mailer.clone()),
        )
    }

    #[tokio::test]
    async fn empty_pending_set_checks_nothing() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.total_checked, 0);
        assert_eq!(generation.fetch_count(), 0);
    }

    #[tokio::test]
    async fn successful_run_is_delivered_and_cleaned_up() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        store
            .record_run("abc123", &record("ana@example.com"))
            .await
            .unwrap();
        generation.succeed_with_url("abc123", "https://x/y.jpg");

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.completed, vec!["abc123"]);
        assert!(summary.failed.is_empty());
        assert!(summary.errors.is_empty());
        assert_eq!(summary.total_checked, 1);

        assert_eq!(mailer.recipients(), vec!["ana@example.com"]);
        assert!(store.pending_runs().await.unwrap().is_empty());
        assert!(store.run_record("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn one_broken_run_does_not_abort_the_batch() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        for id in ["run-a", "run-b", "run-c"] {
            store.record_run(id, &record("ana@example.com")).await.unwrap();
        }
        generation.succeed_with_url("run-a", "https://x/a.jpg");
        generation.script("run-b", vec![Err("connection reset".to_string())]);
        generation.succeed_with_url("run-c", "https://x/c.jpg");

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.completed, vec!["run-a", "run-c"]);
        assert_eq!(summary.total_checked, 3);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].run_id, "run-b");

        // The broken run stays pending for the next sweep.
        assert_eq!(store.pending_runs().await.unwrap(), vec!["run-b"]);
        assert_eq!(mailer.sent_count(), 2);
    }

    #[tokio::test]
    async fn failed_run_leaves_pending_but_keeps_its_record() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        store
            .record_run("abc123", &record("ana@example.com"))
            .await
            .unwrap();
        generation.script(
            "abc123",
            vec![Ok(RunPayload {
                status: Some("failed".to_string()),
                ..Default::default()
            })],
        );

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.failed, vec!["abc123"]);
        assert!(summary.completed.is_empty());
        assert!(store.pending_runs().await.unwrap().is_empty());
        // Retained for inspection.
        assert!(store.run_record("abc123").await.unwrap().is_some());
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn in_progress_run_is_left_untouched() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        store
            .record_run("abc123", &record("ana@example.com"))
            .await
            .unwrap();
        generation.script(
            "abc123",
            vec![Ok(RunPayload {
                status: Some("running".to_string()),
                ..Default::default()
            })],
        );

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert!(summary.completed.is_empty());
        assert!(summary.failed.is_empty());
        assert_eq!(store.pending_runs().await.unwrap(), vec!["abc123"]);
    }

    #[tokio::test]
    async fn success_without_record_still_completes() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        // Pending entry exists but the record hash is gone (partial
        // bookkeeping from a degraded submission).
        store.record_run("ghost", &record("ana@example.com")).await.unwrap();
        store.delete_record("ghost").await.unwrap();
        generation.succeed_with_url("ghost", "https://x/g.jpg");

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.completed, vec!["ghost"]);
        assert_eq!(mailer.sent_count(), 0);
        assert!(store.pending_runs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_does_not_resend_after_interactive_delivery() {
        let store = store_with_memory_kv();
        let generation = Arc::new(ScriptedGeneration::default());
        let mailer = Arc::new(RecordingMailer::default());

        store
            .record_run("abc123", &record("ana@example.com"))
            .await
            .unwrap();
        generation.succeed_with_url("abc123", "https://x/y.jpg");
        // The interactive path already delivered this run.
        store.mark_sent("abc123").await.unwrap();

        let summary = reconciler(&store, &generation, &mailer)
            .run_sweep()
            .await
            .unwrap();

        assert_eq!(summary.completed, vec!["abc123"]);
        assert_eq!(mailer.sent_count(), 0);
    }
}
