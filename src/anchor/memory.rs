use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::anchor::AnchorAdapter;
use crate::error::Result;
use crate::storage::take_newest;

/// In-process anchor; clones share the same hash list
#[derive(Clone, Default)]
pub struct MemoryAnchor {
    hashes: Arc<Mutex<Vec<String>>>,
}

impl MemoryAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hashes(hashes: Vec<String>) -> Self {
        Self {
            hashes: Arc::new(Mutex::new(hashes)),
        }
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.hashes.lock().await.clone()
    }
}

#[async_trait]
impl AnchorAdapter for MemoryAnchor {
    async fn write(&self, hash: &str) -> Result<()> {
        self.hashes.lock().await.push(hash.to_string());
        Ok(())
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        Ok(take_newest(self.snapshot().await, limit))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
