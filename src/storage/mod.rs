//! Storage Adapters
//!
//! Durable append and ordered read of serialized entries. The core never
//! looks inside a medium; it only needs the contract below.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::{ChainLogError, Result};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Append-only medium for serialized entries
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Durably append one serialized entry
    async fn write(&self, entry: &str) -> Result<()>;

    /// Read serialized entries, oldest first.
    ///
    /// `None` returns everything; `Some(n)` returns only the newest `n`.
    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>>;

    /// Append only if the newest stored entry still has hash `expected_newest`
    /// (`None`: the store must be empty). Fails with `TipConflict` otherwise.
    async fn compare_and_append(&self, expected_newest: Option<&str>, entry: &str) -> Result<()> {
        let _ = (expected_newest, entry);
        Err(ChainLogError::Unsupported(format!(
            "{} storage has no compare-and-append",
            self.name()
        )))
    }

    /// Short medium name used in logs
    fn name(&self) -> &'static str;
}

/// Keep only the newest `limit` items of an oldest-first sequence
pub(crate) fn take_newest<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit {
        if items.len() > n {
            items.drain(..items.len() - n);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_newest() {
        let items = vec![1, 2, 3, 4];
        assert_eq!(take_newest(items.clone(), None), vec![1, 2, 3, 4]);
        assert_eq!(take_newest(items.clone(), Some(1)), vec![4]);
        assert_eq!(take_newest(items.clone(), Some(3)), vec![2, 3, 4]);
        assert_eq!(take_newest(items.clone(), Some(10)), vec![1, 2, 3, 4]);
        assert!(take_newest(items, Some(0)).is_empty());
    }
}
