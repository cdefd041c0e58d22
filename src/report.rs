use serde::Serialize;

/// Outcome of checking one storage snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    /// Raw entries returned by storage
    pub raw_count: usize,
    /// Raw entries that could not be parsed
    pub malformed_count: usize,
    /// Entries accepted by local link validation
    pub chain_accepted: usize,
    /// Whether an anchor medium was consulted
    pub anchor_checked: bool,
    /// Entries corroborated by the anchor medium
    pub anchor_accepted: usize,
    /// Hashes of entries rejected by either filter, oldest first
    pub rejected_hashes: Vec<String>,
}

impl ConsistencyReport {
    /// Number of entries that survive every configured filter
    pub fn accepted(&self) -> usize {
        if self.anchor_checked {
            self.anchor_accepted
        } else {
            self.chain_accepted
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.malformed_count == 0 && self.rejected_hashes.is_empty()
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.is_consistent() {
            format!("Chain is consistent ({} entries)", self.raw_count)
        } else {
            format!(
                "Chain is inconsistent: {} of {} entries accepted, {} malformed, {} rejected",
                self.accepted(),
                self.raw_count,
                self.malformed_count,
                self.rejected_hashes.len()
            )
        }
    }

    /// Get detailed status
    pub fn detailed_status(&self) -> String {
        let anchor = if self.anchor_checked {
            self.anchor_accepted.to_string()
        } else {
            "not configured".to_string()
        };
        format!(
            "Entries: {}\nMalformed: {}\nChain accepted: {}\nAnchor accepted: {}\nRejected: {}",
            self.raw_count,
            self.malformed_count,
            self.chain_accepted,
            anchor,
            self.rejected_hashes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_report() {
        let report = ConsistencyReport {
            raw_count: 3,
            chain_accepted: 3,
            ..Default::default()
        };

        assert!(report.is_consistent());
        assert_eq!(report.accepted(), 3);
        assert!(report.summary().contains("consistent (3 entries)"));
        assert!(report.detailed_status().contains("not configured"));
    }

    #[test]
    fn test_inconsistent_report() {
        let report = ConsistencyReport {
            raw_count: 4,
            malformed_count: 1,
            chain_accepted: 2,
            anchor_checked: true,
            anchor_accepted: 1,
            rejected_hashes: vec!["h2".to_string()],
        };

        assert!(!report.is_consistent());
        assert_eq!(report.accepted(), 1);
        assert!(report.summary().contains("1 of 4 entries accepted"));
    }
}
