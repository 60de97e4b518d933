use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

/// Named, monotonically increasing counters owned by a single service.
///
/// Only increments and snapshots are exposed: request handlers bump counters
/// concurrently with status endpoints reading them, and nothing can ever
/// decrement or reset one.
#[derive(Debug, Default)]
pub struct Counters {
    values: RwLock<HashMap<String, u64>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn increment(&self, name: &str) {
        self.add(name, 1).await
    }

    pub async fn add(&self, name: &str, value: u64) {
        if value == 0 {
            return;
        }
        let mut values = self.values.write().await;
        let counter = values.entry(name.to_owned()).or_default();
        *counter = counter.saturating_add(value);
    }

    pub async fn get(&self, name: &str) -> u64 {
        self.values.read().await.get(name).copied().unwrap_or_default()
    }

    /// A consistent copy of every counter, ordered by name.
    pub async fn snapshot(&self) -> BTreeMap<String, u64> {
        self.values
            .read()
            .await
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}
