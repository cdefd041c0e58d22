//! Anchor Adapters
//!
//! Publish entry hashes to an independent, append-only medium and read
//! them back in publication order. Only hashes ever reach an anchor.

pub mod file;
pub mod http;
pub mod memory;
pub mod pending;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileAnchor;
pub use http::HttpAnchor;
pub use memory::MemoryAnchor;
pub use pending::PendingAnchors;

/// External medium recording entry hashes
#[async_trait]
pub trait AnchorAdapter: Send + Sync {
    /// Publish one hash
    async fn write(&self, hash: &str) -> Result<()>;

    /// Previously published hashes, oldest first.
    ///
    /// `None` returns everything; `Some(n)` returns only the newest `n`.
    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>>;

    /// Short medium name used in logs
    fn name(&self) -> &'static str;
}
