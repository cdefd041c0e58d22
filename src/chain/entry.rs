//! Chain Entry
//!
//! Defines the tamper-evident log entry and its SHA-256 hash over the
//! canonical JSON form of `{data, meta}`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ChainLogError, Result};

/// Entry metadata linking an entry to its predecessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMeta {
    pub timestamp: DateTime<Utc>,
    pub previous_hash: String,
}

/// Log entry with cryptographic link to the previous entry.
///
/// Field order is part of the wire format: `data`, `meta`, `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub data: T,
    pub meta: EntryMeta,
    pub hash: String,
}

/// The hashed portion of an entry
#[derive(Serialize)]
struct EntryBody<'a, T> {
    data: &'a T,
    meta: &'a EntryMeta,
}

impl<T: Serialize> Entry<T> {
    /// Create a new entry chained to `previous_hash`, stamped with the current time
    pub fn new(data: T, previous_hash: String) -> Result<Self> {
        Self::with_timestamp(data, previous_hash, Utc::now())
    }

    /// Create a new entry with an explicit timestamp
    pub fn with_timestamp(
        data: T,
        previous_hash: String,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let meta = EntryMeta {
            timestamp,
            previous_hash,
        };
        let hash = calculate_hash(&data, &meta)?;

        Ok(Self { data, meta, hash })
    }

    /// Canonical string representation for hashing
    pub fn canonical_string(&self) -> Result<String> {
        canonical_string(&self.data, &self.meta)
    }

    /// Recompute the hash of `{data, meta}`
    pub fn calculate_hash(&self) -> Result<String> {
        calculate_hash(&self.data, &self.meta)
    }

    /// Verify this entry's stored hash against its content
    pub fn verify_hash(&self) -> bool {
        matches!(self.calculate_hash(), Ok(hash) if hash == self.hash)
    }

    /// Serialize to the single-line wire form handed to storage
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> Entry<T> {
    /// Parse a raw stored entry
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ChainLogError::MalformedEntry(e.to_string()))
    }
}

impl<T> Entry<T> {
    pub fn previous_hash(&self) -> &str {
        &self.meta.previous_hash
    }
}

fn canonical_string<T: Serialize>(data: &T, meta: &EntryMeta) -> Result<String> {
    Ok(serde_json::to_string(&EntryBody { data, meta })?)
}

fn calculate_hash<T: Serialize>(data: &T, meta: &EntryMeta) -> Result<String> {
    let canonical = canonical_string(data, meta)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Extract the `hash` field of a raw entry without decoding its payload
pub fn peek_hash(raw: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct HashOnly {
        hash: String,
    }

    serde_json::from_str::<HashOnly>(raw).ok().map(|h| h.hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entry_creation() {
        let entry = Entry::new("payload".to_string(), "abc".to_string()).unwrap();

        assert_eq!(entry.data, "payload");
        assert_eq!(entry.previous_hash(), "abc");
        assert!(entry.verify_hash());
    }

    #[test]
    fn test_hash_format() {
        let entry = Entry::with_timestamp(json!({"k": 1}), "abc".to_string(), fixed_time()).unwrap();

        assert_eq!(entry.hash.len(), 64);
        assert!(entry
            .hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(entry.hash, entry.calculate_hash().unwrap());
    }

    #[test]
    fn test_canonical_string_field_order() {
        let entry = Entry::with_timestamp("x".to_string(), "abc".to_string(), fixed_time()).unwrap();

        let canonical = entry.canonical_string().unwrap();
        assert_eq!(
            canonical,
            r#"{"data":"x","meta":{"timestamp":"2024-03-01T12:00:00Z","previousHash":"abc"}}"#
        );
        assert_eq!(entry.hash, sha256_hex(canonical.as_bytes()));
    }

    #[test]
    fn test_wire_format_field_order() {
        let entry = Entry::with_timestamp("x".to_string(), "abc".to_string(), fixed_time()).unwrap();

        let wire = entry.to_json().unwrap();
        let data_pos = wire.find("\"data\"").unwrap();
        let meta_pos = wire.find("\"meta\"").unwrap();
        let hash_pos = wire.find("\"hash\"").unwrap();
        assert!(data_pos < meta_pos && meta_pos < hash_pos);

        let parsed: Entry<String> = Entry::from_json(&wire).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_hash_depends_on_previous_hash() {
        let a = Entry::with_timestamp("x".to_string(), "abc".to_string(), fixed_time()).unwrap();
        let b = Entry::with_timestamp("x".to_string(), "abd".to_string(), fixed_time()).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_tampered_entry_fails_verification() {
        let mut entry = Entry::new("x".to_string(), "abc".to_string()).unwrap();
        entry.data = "y".to_string();
        assert!(!entry.verify_hash());
    }

    #[test]
    fn test_malformed_entry() {
        let result = Entry::<String>::from_json("{not json");
        assert!(matches!(result, Err(ChainLogError::MalformedEntry(_))));
    }

    #[test]
    fn test_peek_hash() {
        let entry = Entry::new(json!({"a": [1, 2]}), "abc".to_string()).unwrap();
        let wire = entry.to_json().unwrap();

        assert_eq!(peek_hash(&wire), Some(entry.hash));
        assert_eq!(peek_hash("garbage"), None);
    }
}
