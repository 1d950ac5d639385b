//! REST client for an Upstash-compatible key-value store.
//!
//! Commands are POSTed to the base URL as a JSON array
//! (`["SADD", "runs:pending", "..."]`) with bearer authentication; the
//! store answers `{ "result": ... }`. This is the protocol behind the
//! hosted KV offering the deployment uses.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::store::{KvError, KvStore};

/// HTTP client for the KV REST endpoint.
pub struct RestKv {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestKv {
    /// Create a new client for the given REST endpoint and token.
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling across collaborator clients).
    pub fn with_client(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Execute one command and return the raw `result` value.
    async fn command(&self, cmd: &[&str]) -> Result<Value, KvError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(KvError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut envelope: Value = response.json().await?;
        match envelope.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(KvError::Protocol(format!(
                "response for {} carried no 'result' field",
                cmd.first().copied().unwrap_or("<empty>")
            ))),
        }
    }

    fn expect_string_array(cmd: &str, result: Value) -> Result<Vec<String>, KvError> {
        let items = result
            .as_array()
            .ok_or_else(|| KvError::Protocol(format!("{cmd} result is not an array")))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| KvError::Protocol(format!("{cmd} result holds a non-string")))
            })
            .collect()
    }
}

#[async_trait]
impl KvStore for RestKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let result = self.command(&["GET", key]).await?;
        Ok(result.as_str().map(str::to_owned))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.command(&["SET", key, value]).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, KvError> {
        // HGETALL comes back as a flat [field, value, field, value, ...] array.
        let flat = Self::expect_string_array("HGETALL", self.command(&["HGETALL", key]).await?)?;
        if flat.len() % 2 != 0 {
            return Err(KvError::Protocol(
                "HGETALL result has an odd number of entries".to_string(),
            ));
        }
        let mut map = HashMap::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            map.insert(field, value);
        }
        Ok(map)
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), KvError> {
        let mut cmd = vec!["HSET", key];
        for (field, value) in fields {
            cmd.push(field);
            cmd.push(value.as_str());
        }
        self.command(&cmd).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), KvError> {
        self.command(&["SADD", key, member]).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), KvError> {
        self.command(&["SREM", key, member]).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, KvError> {
        Self::expect_string_array("SMEMBERS", self.command(&["SMEMBERS", key]).await?)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, KvError> {
        let result = self.command(&["SISMEMBER", key, member]).await?;
        Ok(result.as_i64().unwrap_or(0) == 1)
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.command(&["DEL", key]).await?;
        Ok(())
    }
}
