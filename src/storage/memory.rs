use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::chain::entry::peek_hash;
use crate::error::{ChainLogError, Result};
use crate::storage::StorageAdapter;

/// In-process storage; clones share the same entries
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing sequence of serialized entries, oldest first
    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Copy of every stored entry
    pub async fn snapshot(&self) -> Vec<String> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Replace a stored entry in place. Exists to model a storage medium
    /// controlled by someone other than the logger.
    pub async fn overwrite(&self, index: usize, raw: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(index) {
            Some(slot) => {
                *slot = raw;
                Ok(())
            }
            None => Err(ChainLogError::StorageWrite(format!(
                "No entry at index {}",
                index
            ))),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn write(&self, entry: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push(entry.to_string());
        debug!("Memory storage holds {} entries", entries.len());
        Ok(())
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        let start = match limit {
            Some(n) => entries.len().saturating_sub(n),
            None => 0,
        };
        Ok(entries[start..].to_vec())
    }

    async fn compare_and_append(&self, expected_newest: Option<&str>, entry: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let newest = entries.iter().rev().find_map(|raw| peek_hash(raw));

        if newest.as_deref() != expected_newest {
            return Err(ChainLogError::tip_conflict(expected_newest, newest.as_deref()));
        }

        entries.push(entry.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
