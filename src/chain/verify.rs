//! Chain Validation
//!
//! Filters a raw entry sequence for local hash-link consistency. An entry
//! is accepted only when its `previousHash` equals the hash of the last
//! accepted entry (or the genesis hash). A rejected entry does not move the
//! cursor, so one bad record never invalidates the entries after it.

use tracing::{debug, warn};

use crate::chain::entry::Entry;

/// Accepted and rejected entries of one validation pass, both oldest first
#[derive(Debug, Clone)]
pub struct ChainValidation<T> {
    pub accepted: Vec<Entry<T>>,
    pub rejected: Vec<Entry<T>>,
}

impl<T> ChainValidation<T> {
    pub fn is_intact(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validate hash links, returning only the accepted entries
pub fn validate_chain<T>(entries: Vec<Entry<T>>, genesis_hash: &str) -> Vec<Entry<T>> {
    partition_chain(entries, genesis_hash).accepted
}

/// Validate hash links, keeping the rejected entries for reporting
pub fn partition_chain<T>(entries: Vec<Entry<T>>, genesis_hash: &str) -> ChainValidation<T> {
    let mut expected = genesis_hash.to_string();
    let mut accepted = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();

    for (i, entry) in entries.into_iter().enumerate() {
        if entry.meta.previous_hash == expected {
            expected = entry.hash.clone();
            accepted.push(entry);
        } else {
            warn!(
                "Hash chain broken at entry {}: expected previous {}, got {}",
                i, expected, entry.meta.previous_hash
            );
            rejected.push(entry);
        }
    }

    debug!(
        "Chain validation: {} accepted, {} rejected",
        accepted.len(),
        rejected.len()
    );

    ChainValidation { accepted, rejected }
}
