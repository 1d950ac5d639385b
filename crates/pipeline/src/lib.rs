//! The run-completion notification workflow.
//!
//! Three pieces reconcile a run's asynchronous lifecycle across the two
//! delivery paths:
//!
//! - [`DeliveryGuard`] -- the at-most-once check around the email
//!   dispatcher, backed by the durable `runs:sent` marker.
//! - [`RunWatcher`] -- the interactive poll loop for the run currently
//!   being watched (the open-tab path).
//! - [`Reconciler`] -- the cron-triggered sweep over every pending run
//!   (the closed-tab path).

pub mod guard;
pub mod sweep;
pub mod watcher;

#[cfg(test)]
pub(crate) mod support;

pub use guard::{DeliveryGuard, DeliveryOutcome};
pub use sweep::{Reconciler, SweepError, SweepSummary};
pub use watcher::{RunWatcher, WatchHandle, WatchSlot, WatchSnapshot, WatcherConfig};
