use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::anchor::{AnchorAdapter, FileAnchor, HttpAnchor, MemoryAnchor};
use crate::error::{ChainLogError, Result};
use crate::logger::{AnchorFailurePolicy, AppendMode, ChainLogger, LoggerOptions, PayloadFilter};
use crate::storage::{FileStorage, MemoryStorage, StorageAdapter};

/// Environment prefix for overrides, e.g. `CHAINLOG__GENESIS_HASH`
pub const ENV_PREFIX: &str = "CHAINLOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    File {
        dir: PathBuf,
        #[serde(default = "default_prefix")]
        prefix: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorConfig {
    #[default]
    None,
    Memory,
    File {
        path: PathBuf,
    },
    Http {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLogConfig {
    pub genesis_hash: String,
    pub storage: StorageConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub payload_filter: PayloadFilter,
    #[serde(default)]
    pub anchor_failure: AnchorFailurePolicy,
    #[serde(default)]
    pub append_mode: AppendMode,
    /// Journal for hashes deferred by `anchor_failure = "defer"`
    #[serde(default)]
    pub pending_anchors_path: Option<PathBuf>,
}

fn default_prefix() -> String {
    "logs".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ChainLogConfig {
    /// Load from an optional TOML file, then apply `CHAINLOG__*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: ChainLogConfig = settings.try_deserialize()?;
        config.validate()?;

        info!("Configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: ChainLogConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.genesis_hash.trim().is_empty() {
            return Err(ChainLogError::Config("genesis_hash must not be empty".to_string()));
        }

        if let StorageConfig::File { prefix, .. } = &self.storage {
            if prefix.is_empty() {
                return Err(ChainLogError::Config("storage prefix must not be empty".to_string()));
            }
        }

        if let AnchorConfig::Http { url, .. } = &self.anchor {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ChainLogError::Config(format!(
                    "anchor url must be http(s): {}",
                    url
                )));
            }
        }

        if let AppendMode::CompareAndAppend { max_retries: 0 } = self.append_mode {
            return Err(ChainLogError::Config(
                "compare_and_append needs max_retries >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Extra checks for a process that exits after one operation, where
    /// anything held only in memory is lost.
    pub fn validate_standalone(&self) -> Result<()> {
        let defers = self.anchor_failure == AnchorFailurePolicy::Defer && self.anchor != AnchorConfig::None;
        if defers && self.pending_anchors_path.is_none() {
            return Err(ChainLogError::Config(
                "anchor_failure = \"defer\" needs pending_anchors_path to keep deferred hashes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn options(&self) -> LoggerOptions {
        LoggerOptions {
            payload_filter: self.payload_filter,
            anchor_failure: self.anchor_failure,
            append_mode: self.append_mode,
        }
    }

    pub fn build_storage(&self) -> Result<Arc<dyn StorageAdapter>> {
        Ok(match &self.storage {
            StorageConfig::Memory => Arc::new(MemoryStorage::new()),
            StorageConfig::File { dir, prefix } => Arc::new(FileStorage::new(dir, prefix.clone())?),
        })
    }

    pub fn build_anchor(&self) -> Result<Option<Arc<dyn AnchorAdapter>>> {
        Ok(match &self.anchor {
            AnchorConfig::None => None,
            AnchorConfig::Memory => Some(Arc::new(MemoryAnchor::new())),
            AnchorConfig::File { path } => Some(Arc::new(FileAnchor::new(path)?)),
            AnchorConfig::Http { url, timeout_secs } => Some(Arc::new(HttpAnchor::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
        })
    }

    /// Instantiate the configured storage and anchor behind a logger
    pub fn build_logger<T>(&self) -> Result<ChainLogger<T>> {
        let mut logger =
            ChainLogger::new(self.genesis_hash.clone(), self.build_storage()?).with_options(self.options());
        if let Some(anchor) = self.build_anchor()? {
            logger = logger.with_anchor(anchor);
        }
        if let Some(path) = &self.pending_anchors_path {
            logger = logger.with_pending_journal(path)?;
        }
        Ok(logger)
    }
}
