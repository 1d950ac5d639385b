//! Typed keyspace for run bookkeeping.
//!
//! Layout:
//!
//! ```text
//! run:{run_id}     hash    contact info + scene + creation timestamp
//! runs:pending     set     run ids awaiting terminal resolution
//! runs:sent        set     run ids whose notification email went out
//! ```
//!
//! `runs:sent` is the single idempotency authority for "has this run's
//! email been sent" -- both delivery paths consult it, and it survives
//! process restarts because it lives in the durable store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::store::{KvError, KvStore};

/// Set of run ids awaiting terminal resolution.
pub const PENDING_KEY: &str = "runs:pending";

/// Set of run ids whose notification has been dispatched.
pub const SENT_KEY: &str = "runs:sent";

/// Hash key for one run's record.
pub fn run_key(run_id: &str) -> String {
    format!("run:{run_id}")
}

/// Contact info and metadata captured at submission time.
///
/// Contact fields are written once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub scene: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Hash representation for `HSET`.
    fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("surname", self.surname.clone()),
            ("email", self.email.clone()),
            ("scene", self.scene.clone()),
        ];
        if let Some(created_at) = self.created_at {
            fields.push(("created_at", created_at.to_rfc3339()));
        }
        fields
    }

    /// Rebuild a record from an `HGETALL` result. Returns `None` for an
    /// empty hash (the record was deleted or never written); individual
    /// missing fields degrade to empty strings rather than failing, since
    /// the sweep must keep working on partially-written records.
    fn from_fields(mut fields: HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let take = |fields: &mut HashMap<String, String>, key: &str| {
            fields.remove(key).unwrap_or_default()
        };
        let created_at = fields
            .remove("created_at")
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Some(Self {
            name: take(&mut fields, "name"),
            surname: take(&mut fields, "surname"),
            email: take(&mut fields, "email"),
            scene: take(&mut fields, "scene"),
            created_at,
        })
    }
}

/// Run bookkeeping over the raw [`KvStore`] commands.
#[derive(Clone)]
pub struct RunStore {
    kv: Arc<dyn KvStore>,
}

impl RunStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Persist a freshly queued run and add it to the pending set.
    pub async fn record_run(&self, run_id: &str, record: &RunRecord) -> Result<(), KvError> {
        let fields = record.to_fields();
        self.kv.hset(&run_key(run_id), &fields).await?;
        self.kv.sadd(PENDING_KEY, run_id).await?;
        Ok(())
    }

    /// Look up the record written at submission time.
    pub async fn run_record(&self, run_id: &str) -> Result<Option<RunRecord>, KvError> {
        let fields = self.kv.hgetall(&run_key(run_id)).await?;
        Ok(RunRecord::from_fields(fields))
    }

    /// All run ids awaiting terminal resolution.
    pub async fn pending_runs(&self) -> Result<Vec<String>, KvError> {
        self.kv.smembers(PENDING_KEY).await
    }

    pub async fn remove_pending(&self, run_id: &str) -> Result<(), KvError> {
        self.kv.srem(PENDING_KEY, run_id).await
    }

    /// Delete the run's record hash. The pending-set entry is removed
    /// separately so the two transitions can be ordered by the caller.
    pub async fn delete_record(&self, run_id: &str) -> Result<(), KvError> {
        self.kv.del(&run_key(run_id)).await
    }

    /// Has a notification already been dispatched for this run?
    pub async fn is_sent(&self, run_id: &str) -> Result<bool, KvError> {
        self.kv.sismember(SENT_KEY, run_id).await
    }

    /// Mark the run's notification as dispatched.
    pub async fn mark_sent(&self, run_id: &str) -> Result<(), KvError> {
        self.kv.sadd(SENT_KEY, run_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    fn ana() -> RunRecord {
        RunRecord {
            name: "Ana".to_string(),
            surname: "Diaz".to_string(),
            email: "ana@example.com".to_string(),
            scene: "guitarra".to_string(),
            created_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn record_round_trips_and_enters_pending() {
        let store = RunStore::new(Arc::new(MemoryKv::new()));
        store.record_run("abc123", &ana()).await.unwrap();

        let loaded = store.run_record("abc123").await.unwrap().unwrap();
        assert_eq!(loaded.email, "ana@example.com");
        assert_eq!(loaded.scene, "guitarra");
        assert!(loaded.created_at.is_some());

        assert_eq!(store.pending_runs().await.unwrap(), vec!["abc123"]);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let store = RunStore::new(Arc::new(MemoryKv::new()));
        assert!(store.run_record("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_record_degrades_to_empty_fields() {
        let kv = Arc::new(MemoryKv::new());
        kv.hset(&run_key("r1"), &[("email", "solo@example.com".into())])
            .await
            .unwrap();

        let store = RunStore::new(kv);
        let record = store.run_record("r1").await.unwrap().unwrap();
        assert_eq!(record.email, "solo@example.com");
        assert_eq!(record.name, "");
        assert!(record.created_at.is_none());
    }

    #[tokio::test]
    async fn sent_marker_lifecycle() {
        let store = RunStore::new(Arc::new(MemoryKv::new()));
        assert!(!store.is_sent("abc123").await.unwrap());
        store.mark_sent("abc123").await.unwrap();
        assert!(store.is_sent("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn cleanup_removes_pending_and_record() {
        let store = RunStore::new(Arc::new(MemoryKv::new()));
        store.record_run("abc123", &ana()).await.unwrap();

        store.remove_pending("abc123").await.unwrap();
        store.delete_record("abc123").await.unwrap();

        assert!(store.pending_runs().await.unwrap().is_empty());
        assert!(store.run_record("abc123").await.unwrap().is_none());
    }
}
