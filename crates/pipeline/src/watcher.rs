//! Interactive poll loop for the run currently being watched.
//!
//! One watcher exists per active submission; starting a new run cancels
//! the previous watcher, so no orphaned timers outlive a run-id change.
//! Pacing is fixed-delay-after-completion: the next tick is scheduled only
//! once the previous one has resolved, so a slow upstream call can never
//! pile ticks up behind itself.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use rockstar_comfy::GenerationApi;
use rockstar_core::status::CanonicalStatus;
use rockstar_kv::RunStore;
use rockstar_mailer::NotifyRequest;

use crate::guard::DeliveryGuard;

/// Observable state of a watched run, published on every tick.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSnapshot {
    pub run_id: String,
    pub status: CanonicalStatus,
    pub live_status: Option<String>,
    pub progress: Option<f64>,
    pub queue_position: Option<i64>,
    pub output_url: Option<String>,
    /// Whether this watcher's delivery-guard invocation sent the email.
    pub email_triggered: bool,
    /// Guard outcome reason, once the guard has been invoked.
    pub email_reason: Option<String>,
}

impl WatchSnapshot {
    fn initial(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: CanonicalStatus::Queued,
            live_status: None,
            progress: None,
            queue_position: None,
            output_url: None,
            email_triggered: false,
            email_reason: None,
        }
    }
}

/// Watcher pacing knobs.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay between completed ticks.
    pub poll_interval: Duration,
    /// Backoff ceiling for transient status-fetch failures.
    pub max_backoff: Duration,
    /// Total watch window; an expired watcher leaves the run to the sweep.
    pub max_watch: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            max_watch: Duration::from_secs(600),
        }
    }
}

/// Spawns watch tasks for newly submitted runs.
#[derive(Clone)]
pub struct RunWatcher {
    generation: Arc<dyn GenerationApi>,
    store: RunStore,
    guard: DeliveryGuard,
    config: WatcherConfig,
}

/// A live watch task: cancellation handle plus the snapshot channel.
pub struct WatchHandle {
    pub run_id: String,
    cancel: CancellationToken,
    snapshots: watch::Receiver<WatchSnapshot>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Request cooperative cancellation. The current tick, if one is in
    /// flight, is not interrupted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn snapshots(&self) -> watch::Receiver<WatchSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> WatchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the watch task to finish (tests and shutdown).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl RunWatcher {
    pub fn new(
        generation: Arc<dyn GenerationApi>,
        store: RunStore,
        guard: DeliveryGuard,
        config: WatcherConfig,
    ) -> Self {
        Self {
            generation,
            store,
            guard,
            config,
        }
    }

    /// Start watching a run. The first status query is issued immediately.
    pub fn spawn(&self, run_id: String) -> WatchHandle {
        let (tx, rx) = watch::channel(WatchSnapshot::initial(&run_id));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(watch_loop(
            self.generation.clone(),
            self.store.clone(),
            self.guard.clone(),
            self.config.clone(),
            run_id.clone(),
            tx,
            cancel.clone(),
        ));

        tracing::info!(run_id = %run_id, "Run watcher started");
        WatchHandle {
            run_id,
            cancel,
            snapshots: rx,
            task,
        }
    }
}

async fn watch_loop(
    generation: Arc<dyn GenerationApi>,
    store: RunStore,
    guard: DeliveryGuard,
    config: WatcherConfig,
    run_id: String,
    tx: watch::Sender<WatchSnapshot>,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut delay = config.poll_interval;
    let mut triggered = false;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!(run_id = %run_id, "Run watcher cancelled");
            break;
        }

        match generation.fetch_run(&run_id).await {
            Ok(payload) => {
                delay = config.poll_interval;
                let (status, output_url) = payload.normalized();

                let mut snapshot = WatchSnapshot {
                    run_id: run_id.clone(),
                    status,
                    live_status: payload.live_status.clone(),
                    progress: payload.progress,
                    queue_position: payload.queue_position,
                    output_url: output_url.clone(),
                    email_triggered: false,
                    email_reason: None,
                };

                if status == CanonicalStatus::Success && !triggered {
                    if let Some(url) = output_url {
                        triggered = true;
                        let request = notify_request(&store, &run_id, url).await;
                        let outcome = guard.attempt(&run_id, &request).await;
                        snapshot.email_triggered = outcome.sent;
                        snapshot.email_reason = Some(outcome.reason);
                    }
                }

                let terminal = status.is_terminal();
                let _ = tx.send(snapshot);

                if terminal {
                    tracing::info!(run_id = %run_id, status = %status, "Run reached terminal state");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Status fetch failed; backing off");
                let mut snapshot = tx.borrow().clone();
                snapshot.status = CanonicalStatus::ApiError;
                snapshot.live_status = Some(e.to_string());
                let _ = tx.send(snapshot);
                delay = (delay * 2).min(config.max_backoff);
            }
        }

        if started.elapsed() >= config.max_watch {
            tracing::warn!(run_id = %run_id, "Watch window elapsed; leaving run to the sweep");
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(run_id = %run_id, "Run watcher cancelled");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Assemble the notification request from the run's stored record. A
/// missing record degrades to an empty request; the guard reports the
/// precondition miss.
async fn notify_request(store: &RunStore, run_id: &str, image_url: String) -> NotifyRequest {
    match store.run_record(run_id).await {
        Ok(Some(record)) => NotifyRequest {
            image_url,
            email: record.email,
            name: Some(record.name),
            surname: Some(record.surname),
            scene: Some(record.scene),
            ..Default::default()
        },
        Ok(None) => {
            tracing::warn!(run_id, "No record for watched run; cannot address notification");
            NotifyRequest {
                image_url,
                ..Default::default()
            }
        }
        Err(e) => {
            tracing::error!(run_id, error = %e, "Record lookup failed for watched run");
            NotifyRequest {
                image_url,
                ..Default::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WatchSlot
// ---------------------------------------------------------------------------

/// The single active watch.
///
/// A new submission replaces (and cancels) whatever was being watched
/// before -- the session watches one run at a time.
#[derive(Clone, Default)]
pub struct WatchSlot {
    inner: Arc<Mutex<Option<WatchHandle>>>,
}

impl WatchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new watcher, cancelling the previous one.
    pub fn replace(&self, handle: WatchHandle) {
        let previous = self.inner.lock().unwrap().replace(handle);
        if let Some(previous) = previous {
            tracing::debug!(run_id = %previous.run_id, "Cancelling superseded run watcher");
            previous.cancel();
        }
    }

    /// Snapshot channel for the given run, when it is the one being watched.
    pub fn subscribe(&self, run_id: &str) -> Option<watch::Receiver<WatchSnapshot>> {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .filter(|handle| handle.run_id == run_id)
            .map(WatchHandle::snapshots)
    }

    /// Cancel the active watcher, if any (graceful shutdown).
    pub fn shutdown(&self) -> Option<WatchHandle> {
        let handle = self.inner.lock().unwrap().take();
        if let Some(handle) = &handle {
            handle.cancel();
        }
        handle
    }
}
