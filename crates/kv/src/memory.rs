//! In-memory stand-in for the external key-value store.
//!
//! Used by unit and integration tests, and by local development when no
//! KV endpoint is configured. Not durable, by definition.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::{KvError, KvStore};

#[derive(Default)]
struct Tables {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
}

/// Mutex-guarded in-memory tables implementing [`KvStore`].
#[derive(Default)]
pub struct MemoryKv {
    tables: Mutex<Tables>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.tables.lock().unwrap().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.tables
            .lock()
            .unwrap()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), KvError> {
        let mut tables = self.tables.lock().unwrap();
        let hash = tables.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.to_string(), value.clone());
        }
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        self.tables
            .lock()
            .unwrap()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        if let Some(set) = self.tables.lock().unwrap().sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        let mut members: Vec<String> = self
            .tables
            .lock()
            .unwrap()
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        // Deterministic iteration order keeps sweep tests stable.
        members.sort();
        Ok(members)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .sets
            .get(key)
            .is_some_and(|set| set.contains(member)))
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        let mut tables = self.tables.lock().unwrap();
        tables.strings.remove(key);
        tables.hashes.remove(key);
        tables.sets.remove(key);
        Ok(())
    }
}
