#![allow(dead_code)]

use async_trait::async_trait;
use chainlog::anchor::MemoryAnchor;
use chainlog::storage::MemoryStorage;
use chainlog::{AnchorAdapter, ChainLogError, ChainLogger, Entry, EntryMeta, Result, StorageAdapter};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const GENESIS: &str = "abc";

/// Memory storage that counts reads and can be told to fail
#[derive(Clone, Default)]
pub struct TestStorage {
    pub inner: MemoryStorage,
    reads: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl TestStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            inner: MemoryStorage::with_entries(entries),
            ..Default::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageAdapter for TestStorage {
    async fn write(&self, entry: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChainLogError::StorageWrite("disk full".to_string()));
        }
        self.inner.write(entry).await
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChainLogError::StorageRead("medium unavailable".to_string()));
        }
        self.inner.read(limit).await
    }

    async fn compare_and_append(&self, expected_newest: Option<&str>, entry: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChainLogError::StorageWrite("disk full".to_string()));
        }
        self.inner.compare_and_append(expected_newest, entry).await
    }

    fn name(&self) -> &'static str {
        "test"
    }
}

/// Memory anchor whose writes and reads can be made to fail
#[derive(Clone, Default)]
pub struct TestAnchor {
    pub inner: MemoryAnchor,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl TestAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn hashes(&self) -> Vec<String> {
        self.inner.snapshot().await
    }
}

#[async_trait]
impl AnchorAdapter for TestAnchor {
    async fn write(&self, hash: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChainLogError::AnchorWrite("rate limited".to_string()));
        }
        self.inner.write(hash).await
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChainLogError::AnchorRead("ledger unreachable".to_string()));
        }
        self.inner.read(limit).await
    }

    fn name(&self) -> &'static str {
        "test"
    }
}

pub fn logger_over<T>(storage: &TestStorage) -> ChainLogger<T> {
    ChainLogger::new(GENESIS, Arc::new(storage.clone()))
}

pub fn anchored_logger_over<T>(storage: &TestStorage, anchor: &TestAnchor) -> ChainLogger<T> {
    logger_over(storage).with_anchor(Arc::new(anchor.clone()))
}

/// Serialized entry with an arbitrary hash, as an attacker could store it
pub fn raw_entry(data: &str, previous_hash: &str, hash: &str) -> String {
    let entry = Entry {
        data: data.to_string(),
        meta: EntryMeta {
            timestamp: Utc::now(),
            previous_hash: previous_hash.to_string(),
        },
        hash: hash.to_string(),
    };
    serde_json::to_string(&entry).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
