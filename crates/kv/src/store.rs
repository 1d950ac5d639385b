//! The key-value command surface this system relies on.

use std::collections::HashMap;

use async_trait::async_trait;

/// Errors from the key-value store boundary.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("KV request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store returned a non-2xx status code.
    #[error("KV API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The store answered 200 but with an unexpected result shape.
    #[error("KV protocol error: {0}")]
    Protocol(String),
}

/// The subset of Redis-style commands the run bookkeeping needs.
///
/// Implemented by [`RestKv`](crate::RestKv) against the real store and by
/// [`MemoryKv`](crate::MemoryKv) for tests and local development.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError>;
    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), KvError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError>;
    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError>;

    async fn del(&self, key: &str) -> Result<(), KvError>;
}
