//! Process-local bookkeeping of execution records.
//!
//! Records are never persisted: after a restart every id is unknown.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::unified::{ExecutionRecord, ExecutionState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCounts {
    pub total: u64,
    pub queued: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl ExecutionCounts {
    fn add(&mut self, state: ExecutionState) {
        self.total += 1;
        match state {
            ExecutionState::Queued => self.queued += 1,
            ExecutionState::Processing => self.processing += 1,
            ExecutionState::Completed => self.completed += 1,
            ExecutionState::Failed => self.failed += 1,
        }
    }
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn insert(&self, record: ExecutionRecord);

    async fn get(&self, id: &Uuid) -> Option<ExecutionRecord>;

    /// Replace an existing record. Returns false if the id is unknown.
    async fn put(&self, record: ExecutionRecord) -> bool;

    async fn counts(&self) -> ExecutionCounts;
}

/// Unbounded map with no eviction.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    records: DashMap<Uuid, ExecutionRecord>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn insert(&self, record: ExecutionRecord) {
        self.records.insert(record.id, record);
    }

    async fn get(&self, id: &Uuid) -> Option<ExecutionRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    async fn put(&self, record: ExecutionRecord) -> bool {
        match self.records.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record;
                true
            }
            None => false,
        }
    }

    async fn counts(&self) -> ExecutionCounts {
        let mut counts = ExecutionCounts::default();
        for entry in self.records.iter() {
            counts.add(entry.value().state);
        }
        counts
    }
}

/// Bounded store whose records expire a fixed time after their last write.
#[derive(Debug, Clone)]
pub struct ExpiringExecutionStore {
    records: Cache<Uuid, ExecutionRecord>,
}

impl ExpiringExecutionStore {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            records: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ExecutionStore for ExpiringExecutionStore {
    async fn insert(&self, record: ExecutionRecord) {
        self.records.insert(record.id, record).await;
    }

    async fn get(&self, id: &Uuid) -> Option<ExecutionRecord> {
        self.records.get(id).await
    }

    async fn put(&self, record: ExecutionRecord) -> bool {
        if !self.records.contains_key(&record.id) {
            return false;
        }
        self.records.insert(record.id, record).await;
        true
    }

    async fn counts(&self) -> ExecutionCounts {
        let mut counts = ExecutionCounts::default();
        for (_, record) in self.records.iter() {
            counts.add(record.state);
        }
        counts
    }
}
