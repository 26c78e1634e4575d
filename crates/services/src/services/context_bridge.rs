use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::services::unified::SystemKind;

/// Shared buffer for one hybrid run: the first phase publishes its result,
/// the second phase reads a snapshot of everything published so far.
#[derive(Debug, Default)]
pub struct ContextBridge {
    entries: RwLock<HashMap<SystemKind, Value>>,
}

impl ContextBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, system: SystemKind, value: Value) {
        self.entries.write().await.insert(system, value);
    }

    pub async fn get(&self, system: SystemKind) -> Option<Value> {
        self.entries.read().await.get(&system).cloned()
    }

    /// Object keyed by system name (`{"v1": ..}`).
    pub async fn snapshot(&self) -> Value {
        let entries = self.entries.read().await;
        let map: Map<String, Value> = entries
            .iter()
            .map(|(system, value)| (system.to_string(), value.clone()))
            .collect();
        Value::Object(map)
    }
}
