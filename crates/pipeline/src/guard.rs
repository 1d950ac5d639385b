//! At-most-once delivery around the email dispatcher.
//!
//! Both delivery paths (interactive watcher, reconciliation sweep) go
//! through the same guard, and the guard's authority is the durable
//! `runs:sent` marker -- so "at most once" holds across paths and across
//! process restarts, not just within one instance.

use std::sync::Arc;

use rockstar_kv::RunStore;
use rockstar_mailer::{Mailer, NotifyRequest};

/// Result of a delivery attempt. Never an error: precondition misses and
/// dispatch failures both come back as `sent: false` with a reason
/// suitable for logs and poll responses.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub sent: bool,
    pub reason: String,
}

impl DeliveryOutcome {
    fn skipped(reason: &str) -> Self {
        Self {
            sent: false,
            reason: reason.to_string(),
        }
    }
}

/// The idempotency check in front of the dispatcher.
#[derive(Clone)]
pub struct DeliveryGuard {
    store: RunStore,
    mailer: Arc<dyn Mailer>,
}

impl DeliveryGuard {
    pub fn new(store: RunStore, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Attempt to deliver the notification for a successfully finished run.
    ///
    /// Preconditions checked here: an output URL, a recipient address, and
    /// no prior send recorded for this run. Callers are responsible for
    /// only invoking this on canonical `Success`.
    ///
    /// The sent marker is written only after the dispatcher reports
    /// success; a dispatch failure leaves it unset so a later sweep pass
    /// can retry. A marker read/write failure degrades to best-effort
    /// rather than blocking delivery.
    pub async fn attempt(&self, run_id: &str, request: &NotifyRequest) -> DeliveryOutcome {
        if request.image_url.is_empty() {
            return DeliveryOutcome::skipped("no output url");
        }
        if request.email.is_empty() {
            return DeliveryOutcome::skipped("missing email");
        }

        match self.store.is_sent(run_id).await {
            Ok(true) => return DeliveryOutcome::skipped("already sent"),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Sent-marker lookup failed; proceeding");
            }
        }

        match self.mailer.send_run_ready(request).await {
            Ok(report) => {
                if let Err(e) = self.store.mark_sent(run_id).await {
                    tracing::warn!(run_id, error = %e, "Failed to persist sent marker");
                }
                tracing::info!(
                    run_id,
                    to = %request.email,
                    attached = report.attached,
                    "Notification delivered"
                );
                DeliveryOutcome {
                    sent: true,
                    reason: "sent".to_string(),
                }
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "Notification dispatch failed");
                DeliveryOutcome {
                    sent: false,
                    reason: format!("send failed: {e}"),
                }
            }
        }
    }
}
