//! Memory/cache service used by the graph pipeline to carry context between
//! runs for the same user.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BackendError, check_status, join_url, segment_url};

const SERVICE: &str = "memory service";

#[async_trait]
pub trait MemoryService: Send + Sync {
    async fn recall(&self, key: &str) -> Result<Option<Value>, BackendError>;

    async fn remember(&self, key: &str, value: Value) -> Result<(), BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;

    /// Cache counters, for implementations that keep them locally.
    fn stats(&self) -> Option<MemoryStats> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

/// In-process memory with a bounded size and a per-entry TTL.
#[derive(Debug, Clone)]
pub struct LocalMemoryService {
    cache: Cache<String, Value>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl LocalMemoryService {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

}

#[async_trait]
impl MemoryService for LocalMemoryService {
    async fn recall(&self, key: &str) -> Result<Option<Value>, BackendError> {
        let value = self.cache.get(key).await;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn remember(&self, key: &str, value: Value) -> Result<(), BackendError> {
        self.cache.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn stats(&self) -> Option<MemoryStats> {
        Some(MemoryStats {
            entry_count: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpMemoryService {
    client: Client,
    base_url: String,
    ttl: Duration,
}

impl HttpMemoryService {
    pub fn new(client: Client, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            ttl,
        }
    }
}

#[async_trait]
impl MemoryService for HttpMemoryService {
    async fn recall(&self, key: &str) -> Result<Option<Value>, BackendError> {
        let response = self
            .client
            .get(segment_url(&self.base_url, "memory", &[key]))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(SERVICE, response).await?;
        let value: Value = response.json().await.map_err(|e| BackendError::Malformed {
            service: SERVICE,
            detail: e.to_string(),
        })?;
        Ok(value.get("value").cloned().filter(|v| !v.is_null()))
    }

    async fn remember(&self, key: &str, value: Value) -> Result<(), BackendError> {
        let response = self
            .client
            .put(segment_url(&self.base_url, "memory", &[key]))
            .json(&json!({ "value": value, "ttlSecs": self.ttl.as_secs() }))
            .send()
            .await?;
        check_status(SERVICE, response).await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "health"))
            .send()
            .await?;
        check_status(SERVICE, response).await.map(|_| ())
    }
}
