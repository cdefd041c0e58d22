//! Pending Anchors
//!
//! Hashes whose anchor write failed, oldest first. When backed by a journal
//! file the queue survives process restarts; the file holds one hash per
//! line and is rewritten after every change.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ChainLogError, Result};

#[derive(Debug, Default)]
pub struct PendingAnchors {
    queue: VecDeque<String>,
    journal: Option<PathBuf>,
}

impl PendingAnchors {
    /// Queue kept in memory only
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue persisted at `path`, resuming whatever an earlier run left there
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChainLogError::AnchorWrite(format!("Failed to create pending anchor directory: {}", e))
            })?;
        }

        let queue: VecDeque<String> = match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                return Err(ChainLogError::AnchorRead(format!(
                    "Failed to read pending anchors: {}",
                    e
                )))
            }
        };

        if !queue.is_empty() {
            info!("Resuming {} pending anchors from {}", queue.len(), path.display());
        }

        Ok(Self {
            queue,
            journal: Some(path),
        })
    }

    pub fn journal(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn front(&self) -> Option<&str> {
        self.queue.front().map(String::as_str)
    }

    pub fn push(&mut self, hash: &str) -> Result<()> {
        self.queue.push_back(hash.to_string());
        self.persist()
    }

    pub fn pop_front(&mut self) -> Result<()> {
        self.queue.pop_front();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.journal else {
            return Ok(());
        };

        let mut content = String::new();
        for hash in &self.queue {
            content.push_str(hash);
            content.push('\n');
        }

        // Write aside and rename so a crash never leaves a half-written queue.
        let staging = path.with_extension("tmp");
        fs::write(&staging, content)
            .and_then(|_| fs::rename(&staging, path))
            .map_err(|e| ChainLogError::AnchorWrite(format!("Failed to persist pending anchors: {}", e)))?;

        debug!("{} pending anchors saved to {}", self.queue.len(), path.display());
        Ok(())
    }
}
