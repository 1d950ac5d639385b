//! Request handlers.
//!
//! Each submodule covers one surface of the workflow: run submission and
//! status queries, direct notification, and the reconciliation sweep.
//! Handlers delegate to the workflow crates and map errors via
//! [`AppError`](crate::error::AppError).

pub mod notify;
pub mod reconcile;
pub mod runs;
