//! Anchor Cross-Checking
//!
//! Filters locally validated entries against the sequence of hashes
//! published to an independent anchor medium. The anchor sequence may be
//! sparse, but whatever it does contain must appear in chain order.

use tracing::{debug, warn};

use crate::chain::entry::Entry;

/// Entries corroborated by the anchor medium, and those that were not
#[derive(Debug, Clone)]
pub struct CrossCheck<T> {
    pub corroborated: Vec<Entry<T>>,
    pub unanchored: Vec<Entry<T>>,
}

/// Cross-check entries against anchored hashes, keeping only corroborated entries
pub fn cross_check<T>(entries: Vec<Entry<T>>, anchored: &[String]) -> Vec<Entry<T>> {
    partition_anchored(entries, anchored).corroborated
}

/// Cross-check entries against anchored hashes, keeping the rejects for reporting.
///
/// The anchor cursor only moves forward: a match at index `j` discards every
/// anchor before `j` for the rest of the pass.
pub fn partition_anchored<T>(entries: Vec<Entry<T>>, anchored: &[String]) -> CrossCheck<T> {
    let mut cursor = 0usize;
    let mut corroborated = Vec::with_capacity(entries.len());
    let mut unanchored = Vec::new();

    for entry in entries {
        let found = anchored[cursor..]
            .iter()
            .position(|h| *h == entry.hash)
            .map(|offset| cursor + offset);

        match found {
            Some(j) => {
                if j > cursor {
                    debug!("Skipping {} anchors before {}", j - cursor, entry.hash);
                }
                cursor = j + 1;
                corroborated.push(entry);
            }
            None => {
                warn!("Entry {} not found in anchor sequence from index {}", entry.hash, cursor);
                unanchored.push(entry);
            }
        }
    }

    debug!(
        "Anchor cross-check: {} corroborated, {} unanchored",
        corroborated.len(),
        unanchored.len()
    );

    CrossCheck {
        corroborated,
        unanchored,
    }
}
