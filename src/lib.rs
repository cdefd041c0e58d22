//! Tamper-evident append-only logging.
//!
//! Every entry is chained to its predecessor by SHA-256 hash. Reads can
//! drop entries whose link is broken and, when an anchor medium is
//! configured, entries whose hash was not independently published in order.

pub mod anchor;
pub mod chain;
pub mod config;
pub mod error;
pub mod logger;
pub mod report;
pub mod storage;

pub use anchor::AnchorAdapter;
pub use chain::{cross_check, validate_chain, Entry, EntryMeta};
pub use config::ChainLogConfig;
pub use error::{ChainLogError, Result};
pub use logger::{AnchorFailurePolicy, AppendMode, ChainLogger, LoggerOptions, PayloadFilter};
pub use report::ConsistencyReport;
pub use storage::StorageAdapter;
