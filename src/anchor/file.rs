//! File Anchor
//!
//! Records anchored hashes one per line in an append-only file. Useful when
//! the file lives on a medium the log writer cannot rewrite.

use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::anchor::AnchorAdapter;
use crate::error::{ChainLogError, Result};
use crate::storage::take_newest;

#[derive(Clone)]
pub struct FileAnchor {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl FileAnchor {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChainLogError::AnchorWrite(format!("Failed to create anchor directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ChainLogError::AnchorWrite(format!("Failed to open anchor file: {}", e)))?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AnchorAdapter for FileAnchor {
    async fn write(&self, hash: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        writeln!(file, "{}", hash)
            .map_err(|e| ChainLogError::AnchorWrite(format!("Failed to write anchor: {}", e)))?;
        file.flush()
            .map_err(|e| ChainLogError::AnchorWrite(format!("Failed to flush anchor file: {}", e)))?;
        debug!("Anchored {} to {}", hash, self.path.display());
        Ok(())
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .map_err(|e| ChainLogError::AnchorRead(format!("Failed to open anchor file: {}", e)))?;

        let mut hashes = Vec::new();
        for line in BufReader::new(file).lines() {
            let line =
                line.map_err(|e| ChainLogError::AnchorRead(format!("Failed to read anchor line: {}", e)))?;
            let line = line.trim();
            if !line.is_empty() {
                hashes.push(line.to_string());
            }
        }

        Ok(take_newest(hashes, limit))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
