//! Hash Chain
//!
//! Entry construction plus the two read-side filters: local link
//! validation and cross-checking against an anchor medium.

pub mod cross_check;
pub mod entry;
pub mod verify;

pub use cross_check::{cross_check, partition_anchored, CrossCheck};
pub use entry::{peek_hash, sha256_hex, Entry, EntryMeta};
pub use verify::{partition_chain, validate_chain, ChainValidation};
