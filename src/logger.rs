//! Chain Logger
//!
//! Composes entry construction, storage, anchoring and the two read-side
//! filters behind `log`, `get_logged_data` and `get_most_recent_hash`.
//!
//! Appends are serialized through one fair gate: an append holds it
//! exclusively from tip lookup until the tip cache has been advanced. Reads
//! share the gate, so each read sees a snapshot no append is half-way into.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::anchor::{AnchorAdapter, PendingAnchors};
use crate::chain::{partition_anchored, partition_chain, peek_hash, Entry};
use crate::error::{ChainLogError, Result};
use crate::report::ConsistencyReport;
use crate::storage::StorageAdapter;

/// Which payloads `get_logged_data` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFilter {
    /// Skip payloads that are `null`, `false`, zero or `""`
    #[default]
    DropEmpty,
    KeepAll,
}

impl PayloadFilter {
    pub fn keeps(&self, payload: &Value) -> bool {
        match self {
            Self::KeepAll => true,
            Self::DropEmpty => !is_empty_payload(payload),
        }
    }
}

/// What `log` does when the anchor medium rejects a hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorFailurePolicy {
    /// Fail the append and keep the old tip
    #[default]
    Fail,
    /// Queue the hash for a later retry and let the append succeed
    Defer,
}

/// How appends guard against a tip that moved underneath them.
///
/// Deserializes from a bare name (`"queued"`, `"compare_and_append"`) or
/// from a table tagged by `mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AppendMode {
    /// Plain write, relying on the in-process gate
    #[default]
    Queued,
    /// Storage-level compare-and-append, retried on conflict
    CompareAndAppend {
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum AppendModeName {
    Queued,
    CompareAndAppend,
}

#[derive(Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum AppendModeTable {
    Queued,
    CompareAndAppend {
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AppendModeRepr {
    Name(AppendModeName),
    Table(AppendModeTable),
}

impl<'de> Deserialize<'de> for AppendMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match AppendModeRepr::deserialize(deserializer)? {
            AppendModeRepr::Name(AppendModeName::Queued)
            | AppendModeRepr::Table(AppendModeTable::Queued) => Self::Queued,
            AppendModeRepr::Name(AppendModeName::CompareAndAppend) => Self::CompareAndAppend {
                max_retries: default_max_retries(),
            },
            AppendModeRepr::Table(AppendModeTable::CompareAndAppend { max_retries }) => {
                Self::CompareAndAppend { max_retries }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerOptions {
    pub payload_filter: PayloadFilter,
    pub anchor_failure: AnchorFailurePolicy,
    pub append_mode: AppendMode,
}

/// Cached chain tip, remembering whether any entry has been stored
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainTip {
    Genesis(String),
    Entry(String),
}

impl ChainTip {
    fn hash(&self) -> &str {
        match self {
            Self::Genesis(hash) | Self::Entry(hash) => hash,
        }
    }

    /// Newest stored hash a compare-and-append must find
    fn expected_newest(&self) -> Option<&str> {
        match self {
            Self::Genesis(_) => None,
            Self::Entry(hash) => Some(hash),
        }
    }
}

/// Tamper-evident logger for payloads of type `T`
pub struct ChainLogger<T> {
    genesis_hash: String,
    storage: Arc<dyn StorageAdapter>,
    anchor: Option<Arc<dyn AnchorAdapter>>,
    options: LoggerOptions,
    gate: Arc<RwLock<()>>,
    tip: Arc<Mutex<Option<ChainTip>>>,
    pending_anchors: Arc<Mutex<PendingAnchors>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for ChainLogger<T> {
    fn clone(&self) -> Self {
        Self {
            genesis_hash: self.genesis_hash.clone(),
            storage: Arc::clone(&self.storage),
            anchor: self.anchor.clone(),
            options: self.options,
            gate: Arc::clone(&self.gate),
            tip: Arc::clone(&self.tip),
            pending_anchors: Arc::clone(&self.pending_anchors),
            _payload: PhantomData,
        }
    }
}

impl<T> ChainLogger<T> {
    /// Create a logger over `storage` whose chain starts at `genesis_hash`
    pub fn new(genesis_hash: impl Into<String>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            genesis_hash: genesis_hash.into(),
            storage,
            anchor: None,
            options: LoggerOptions::default(),
            gate: Arc::new(RwLock::new(())),
            tip: Arc::new(Mutex::new(None)),
            pending_anchors: Arc::new(Mutex::new(PendingAnchors::new())),
            _payload: PhantomData,
        }
    }

    /// Cross-check reads against, and publish hashes to, `anchor`
    pub fn with_anchor(mut self, anchor: Arc<dyn AnchorAdapter>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_options(mut self, options: LoggerOptions) -> Self {
        self.options = options;
        self
    }

    /// Keep deferred anchor hashes in a journal file instead of memory
    pub fn with_pending_journal(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.pending_anchors = Arc::new(Mutex::new(PendingAnchors::open(path)?));
        Ok(self)
    }

    pub fn genesis_hash(&self) -> &str {
        &self.genesis_hash
    }

    pub fn options(&self) -> LoggerOptions {
        self.options
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor.is_some()
    }

    /// Hash the next entry will chain to, loading it from storage on first use
    pub async fn get_most_recent_hash(&self) -> Result<String> {
        Ok(self.current_tip().await?.hash().to_string())
    }

    /// Hashes that failed to anchor and wait for `retry_pending_anchors`
    pub async fn pending_anchor_count(&self) -> usize {
        self.pending_anchors.lock().await.len()
    }

    /// Publish queued anchor hashes in chain order, returning how many went out
    pub async fn retry_pending_anchors(&self) -> Result<usize> {
        let _guard = self.gate.write().await;
        match &self.anchor {
            Some(anchor) => self.flush_pending(anchor.as_ref()).await,
            None => Ok(0),
        }
    }

    async fn current_tip(&self) -> Result<ChainTip> {
        let mut cached = self.tip.lock().await;
        if let Some(tip) = cached.as_ref() {
            return Ok(tip.clone());
        }

        let tip = self.load_tip().await?;
        debug!("Loaded chain tip {}", tip.hash());
        *cached = Some(tip.clone());
        Ok(tip)
    }

    async fn load_tip(&self) -> Result<ChainTip> {
        let newest = self.storage.read(Some(1)).await.map_err(|e| {
            error!("Failed to read chain tip from {} storage: {}", self.storage.name(), e);
            e
        })?;

        let Some(raw) = newest.last() else {
            return Ok(ChainTip::Genesis(self.genesis_hash.clone()));
        };

        if let Some(hash) = peek_hash(raw) {
            return Ok(ChainTip::Entry(hash));
        }

        // Newest record is unreadable; fall back to the newest one that parses.
        warn!("Newest stored entry is malformed, scanning full log for chain tip");
        let all = self.storage.read(None).await?;
        Ok(all
            .iter()
            .rev()
            .find_map(|raw| peek_hash(raw))
            .map(ChainTip::Entry)
            .unwrap_or_else(|| ChainTip::Genesis(self.genesis_hash.clone())))
    }

    async fn set_tip(&self, hash: String) {
        *self.tip.lock().await = Some(ChainTip::Entry(hash));
    }

    async fn clear_tip(&self) {
        *self.tip.lock().await = None;
    }

    /// Publish an appended entry's hash according to the failure policy
    async fn publish_anchor(&self, hash: &str) -> Result<()> {
        let Some(anchor) = &self.anchor else {
            return Ok(());
        };

        match self.options.anchor_failure {
            AnchorFailurePolicy::Fail => anchor.write(hash).await.map_err(|e| {
                error!("Failed to anchor {} to {}: {}", hash, anchor.name(), e);
                e
            }),
            AnchorFailurePolicy::Defer => {
                let published = match self.flush_pending(anchor.as_ref()).await {
                    Ok(_) => match anchor.write(hash).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Deferring anchor {} after failure: {}", hash, e);
                            false
                        }
                    },
                    // Keep anchor order equal to chain order.
                    Err(_) => false,
                };

                if !published {
                    self.pending_anchors.lock().await.push(hash).map_err(|e| {
                        error!("Failed to queue anchor {}: {}", hash, e);
                        e
                    })?;
                }
                Ok(())
            }
        }
    }

    async fn flush_pending(&self, anchor: &dyn AnchorAdapter) -> Result<usize> {
        let mut pending = self.pending_anchors.lock().await;
        let mut published = 0;

        while let Some(hash) = pending.front().map(str::to_string) {
            if let Err(e) = anchor.write(&hash).await {
                warn!("Anchor retry failed with {} still pending: {}", pending.len(), e);
                return Err(e);
            }
            pending.pop_front()?;
            published += 1;
        }

        if published > 0 {
            info!("Published {} deferred anchors", published);
        }
        Ok(published)
    }
}

impl<T: Serialize> ChainLogger<T> {
    /// Append `data` to the chain, returning the new entry's hash
    pub async fn log(&self, data: T) -> Result<String> {
        let _guard = self.gate.write().await;

        let hash = match self.options.append_mode {
            AppendMode::Queued => self.append_queued(&data).await?,
            AppendMode::CompareAndAppend { max_retries } => {
                self.append_compare(&data, max_retries).await?
            }
        };

        self.publish_anchor(&hash).await?;
        self.set_tip(hash.clone()).await;

        debug!("Appended entry {}", hash);
        Ok(hash)
    }

    async fn append_queued(&self, data: &T) -> Result<String> {
        let tip = self.current_tip().await?;
        let entry = Entry::new(data, tip.hash().to_string())?;
        let raw = entry.to_json()?;

        self.storage.write(&raw).await.map_err(|e| {
            error!("Failed to write entry to {} storage: {}", self.storage.name(), e);
            e
        })?;

        Ok(entry.hash)
    }

    async fn append_compare(&self, data: &T, max_retries: u32) -> Result<String> {
        let mut attempt = 0;
        loop {
            let tip = self.current_tip().await?;
            let entry = Entry::new(data, tip.hash().to_string())?;
            let raw = entry.to_json()?;

            match self
                .storage
                .compare_and_append(tip.expected_newest(), &raw)
                .await
            {
                Ok(()) => return Ok(entry.hash),
                Err(e @ ChainLogError::TipConflict { .. }) => {
                    if attempt >= max_retries {
                        error!("Giving up append after {} conflicts", attempt + 1);
                        return Err(e);
                    }
                    attempt += 1;
                    warn!("Append conflict ({}), reloading tip, attempt {}", e, attempt);
                    self.clear_tip().await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: DeserializeOwned> ChainLogger<T> {
    /// Logged payloads, oldest first.
    ///
    /// With `require_consistency`, only entries that pass link validation
    /// (and the anchor cross-check, when an anchor is configured) are kept.
    pub async fn get_logged_data(&self, require_consistency: bool) -> Result<Vec<T>> {
        let entries = self.read_entries(require_consistency).await?;
        let filter = self.options.payload_filter;

        Ok(entries
            .into_iter()
            .filter(|entry| filter.keeps(&entry.data))
            .filter_map(decode_payload::<T>)
            .map(|entry| entry.data)
            .collect())
    }

    /// Logged entries with their metadata, oldest first.
    ///
    /// Same filtering as `get_logged_data`, minus the payload filter.
    pub async fn get_logged_entries(&self, require_consistency: bool) -> Result<Vec<Entry<T>>> {
        let entries = self.read_entries(require_consistency).await?;
        Ok(entries.into_iter().filter_map(decode_payload::<T>).collect())
    }
}

impl<T> ChainLogger<T> {
    async fn read_entries(&self, require_consistency: bool) -> Result<Vec<Entry<Value>>> {
        let _guard = self.gate.read().await;

        let (entries, _) = self.read_raw().await?;
        if !require_consistency {
            return Ok(entries);
        }

        let validated = partition_chain(entries, &self.genesis_hash).accepted;
        match &self.anchor {
            Some(anchor) => {
                let anchored = self.read_anchors(anchor.as_ref()).await?;
                Ok(partition_anchored(validated, &anchored).corroborated)
            }
            None => Ok(validated),
        }
    }

    /// Run both filters on one snapshot and report what each rejected
    pub async fn verify(&self) -> Result<ConsistencyReport> {
        let _guard = self.gate.read().await;

        let (entries, malformed_count) = self.read_raw().await?;
        let raw_count = entries.len() + malformed_count;

        let chain = partition_chain(entries, &self.genesis_hash);
        let mut rejected_hashes: Vec<String> =
            chain.rejected.iter().map(|e| e.hash.clone()).collect();
        let chain_accepted = chain.accepted.len();

        let (anchor_checked, anchor_accepted) = match &self.anchor {
            Some(anchor) => {
                let anchored = self.read_anchors(anchor.as_ref()).await?;
                let checked = partition_anchored(chain.accepted, &anchored);
                rejected_hashes.extend(checked.unanchored.iter().map(|e| e.hash.clone()));
                (true, checked.corroborated.len())
            }
            None => (false, 0),
        };

        let report = ConsistencyReport {
            raw_count,
            malformed_count,
            chain_accepted,
            anchor_checked,
            anchor_accepted,
            rejected_hashes,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    /// Parse the full storage log, skipping malformed records
    async fn read_raw(&self) -> Result<(Vec<Entry<Value>>, usize)> {
        let raw = self.storage.read(None).await.map_err(|e| {
            error!("Failed to read entries from {} storage: {}", self.storage.name(), e);
            e
        })?;

        let mut entries = Vec::with_capacity(raw.len());
        let mut malformed = 0;
        for (i, line) in raw.iter().enumerate() {
            match Entry::<Value>::from_json(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Skipping stored entry {}: {}", i, e);
                    malformed += 1;
                }
            }
        }

        debug!("Read {} entries ({} malformed)", entries.len(), malformed);
        Ok((entries, malformed))
    }

    async fn read_anchors(&self, anchor: &dyn AnchorAdapter) -> Result<Vec<String>> {
        anchor.read(None).await.map_err(|e| {
            error!("Failed to read anchors from {}: {}", anchor.name(), e);
            e
        })
    }
}

fn decode_payload<T: DeserializeOwned>(entry: Entry<Value>) -> Option<Entry<T>> {
    let Entry { data, meta, hash } = entry;
    match serde_json::from_value::<T>(data) {
        Ok(data) => Some(Entry { data, meta, hash }),
        Err(e) => {
            warn!("Skipping entry {} with unexpected payload: {}", hash, e);
            None
        }
    }
}

/// `null`, `false`, numeric zero and the empty string count as empty
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::MemoryAnchor;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn memory_logger<T>(genesis: &str) -> (ChainLogger<T>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let logger = ChainLogger::new(genesis, Arc::new(storage.clone()));
        (logger, storage)
    }

    #[test]
    fn test_is_empty_payload() {
        assert!(is_empty_payload(&json!(null)));
        assert!(is_empty_payload(&json!(false)));
        assert!(is_empty_payload(&json!(0)));
        assert!(is_empty_payload(&json!(0.0)));
        assert!(is_empty_payload(&json!("")));

        assert!(!is_empty_payload(&json!(true)));
        assert!(!is_empty_payload(&json!(7)));
        assert!(!is_empty_payload(&json!("x")));
        assert!(!is_empty_payload(&json!([])));
        assert!(!is_empty_payload(&json!({})));
    }

    #[tokio::test]
    async fn test_first_entry_links_to_genesis() {
        let (logger, _storage) = memory_logger::<String>("abc");

        logger.log("x".to_string()).await.unwrap();

        let entries = logger.get_logged_entries(false).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].previous_hash(), "abc");
        assert!(entries[0].verify_hash());
    }

    #[tokio::test]
    async fn test_consecutive_entries_link() {
        let (logger, _storage) = memory_logger::<String>("abc");

        let h1 = logger.log("x".to_string()).await.unwrap();
        let h2 = logger.log("y".to_string()).await.unwrap();

        let entries = logger.get_logged_entries(false).await.unwrap();
        assert_eq!(entries[1].previous_hash(), h1);
        assert_eq!(entries[1].hash, h2);
        assert_eq!(logger.get_most_recent_hash().await.unwrap(), h2);
    }

    #[tokio::test]
    async fn test_tip_loaded_from_existing_storage() {
        let (first, storage) = memory_logger::<String>("abc");
        let hash = first.log("x".to_string()).await.unwrap();

        let second: ChainLogger<String> = ChainLogger::new("abc", Arc::new(storage));
        assert_eq!(second.get_most_recent_hash().await.unwrap(), hash);
    }

    #[tokio::test]
    async fn test_tip_skips_malformed_newest_entry() {
        let (first, storage) = memory_logger::<String>("abc");
        let hash = first.log("x".to_string()).await.unwrap();
        storage.write("not json").await.unwrap();

        let second: ChainLogger<String> = ChainLogger::new("abc", Arc::new(storage));
        assert_eq!(second.get_most_recent_hash().await.unwrap(), hash);
    }

    #[tokio::test]
    async fn test_payload_filter() {
        let (logger, storage) = memory_logger::<Value>("abc");
        for payload in [json!("a"), json!(""), json!(null), json!(0), json!({"k": 1})] {
            logger.log(payload).await.unwrap();
        }

        let dropped = logger.get_logged_data(true).await.unwrap();
        assert_eq!(dropped, vec![json!("a"), json!({"k": 1})]);

        let keep_all: ChainLogger<Value> = ChainLogger::new("abc", Arc::new(storage))
            .with_options(LoggerOptions {
                payload_filter: PayloadFilter::KeepAll,
                ..Default::default()
            });
        assert_eq!(keep_all.get_logged_data(true).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_unexpected_payload_type_skipped() {
        let (raw_logger, storage) = memory_logger::<Value>("abc");
        raw_logger.log(json!("text")).await.unwrap();
        raw_logger.log(json!(42)).await.unwrap();

        let typed: ChainLogger<u32> = ChainLogger::new("abc", Arc::new(storage));
        assert_eq!(typed.get_logged_data(true).await.unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn test_anchor_receives_hash_only() {
        let (logger, _storage) = memory_logger::<String>("abc");
        let anchor = MemoryAnchor::new();
        let logger = logger.with_anchor(Arc::new(anchor.clone()));

        let hash = logger.log("secret payload".to_string()).await.unwrap();

        assert_eq!(anchor.snapshot().await, vec![hash]);
    }

    #[tokio::test]
    async fn test_verify_reports_rejections() {
        let (logger, storage) = memory_logger::<String>("abc");
        logger.log("x".to_string()).await.unwrap();
        logger.log("y".to_string()).await.unwrap();
        storage.write("{}").await.unwrap();

        let report = logger.verify().await.unwrap();
        assert_eq!(report.raw_count, 3);
        assert_eq!(report.malformed_count, 1);
        assert_eq!(report.chain_accepted, 2);
        assert!(!report.anchor_checked);
        assert!(!report.is_consistent());
    }
}
