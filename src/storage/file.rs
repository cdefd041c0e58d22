//! Local File Storage
//!
//! Appends entries as JSON lines to daily log files named
//! `{prefix}_{YYYY-MM-DD}.log` inside one directory.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chain::entry::peek_hash;
use crate::error::{ChainLogError, Result};
use crate::storage::{take_newest, StorageAdapter};

struct ActiveFile {
    path: PathBuf,
    file: File,
}

/// Append-only JSONL storage rotated by date
#[derive(Clone)]
pub struct FileStorage {
    dir: PathBuf,
    prefix: String,
    active: Arc<Mutex<Option<ActiveFile>>>,
}

impl FileStorage {
    /// Create file storage rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| ChainLogError::StorageWrite(format!("Failed to create log directory: {}", e)))?;

        info!("File storage at {}", dir.display());

        Ok(Self {
            dir,
            prefix: prefix.into(),
            active: Arc::new(Mutex::new(None)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file path for a given day
    pub fn file_path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.log", self.prefix, day.format("%Y-%m-%d")))
    }

    /// Day encoded in `name` when it is one of this prefix's log files
    fn day_of(&self, name: &str) -> Option<NaiveDate> {
        let day = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(".log")?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Existing log files for this prefix, oldest first
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let dir = fs::read_dir(&self.dir)
            .map_err(|e| ChainLogError::StorageRead(format!("Failed to list log directory: {}", e)))?;

        for item in dir {
            let item = item
                .map_err(|e| ChainLogError::StorageRead(format!("Failed to list log directory: {}", e)))?;
            let name = item.file_name().to_string_lossy().to_string();
            if let Some(day) = self.day_of(&name) {
                files.push((day, item.path()));
            }
        }

        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    fn read_lines(path: &Path) -> Result<Vec<String>> {
        let file = File::open(path)
            .map_err(|e| ChainLogError::StorageRead(format!("Failed to open log file: {}", e)))?;

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line =
                line.map_err(|e| ChainLogError::StorageRead(format!("Failed to read log line: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Open today's file, closing the previous one on date change
    fn refresh<'a>(&self, active: &'a mut Option<ActiveFile>) -> Result<&'a mut ActiveFile> {
        let path = self.file_path_for(Utc::now().date_naive());
        let stale = active.as_ref().map_or(true, |a| a.path != path);

        if stale {
            if let Some(old) = active.as_mut() {
                old.file
                    .flush()
                    .map_err(|e| ChainLogError::StorageWrite(format!("Failed to flush log file: {}", e)))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| ChainLogError::StorageWrite(format!("Failed to open log file: {}", e)))?;
            debug!("Writing to {}", path.display());
            *active = Some(ActiveFile { path, file });
        }

        active
            .as_mut()
            .ok_or_else(|| ChainLogError::StorageWrite("Log file not available".to_string()))
    }

    fn append_line(&self, active: &mut Option<ActiveFile>, entry: &str) -> Result<()> {
        let target = self.refresh(active)?;
        writeln!(target.file, "{}", entry)
            .map_err(|e| ChainLogError::StorageWrite(format!("Failed to write log entry: {}", e)))?;
        target
            .file
            .flush()
            .map_err(|e| ChainLogError::StorageWrite(format!("Failed to flush log file: {}", e)))?;
        Ok(())
    }

    fn read_newest(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let files = self.log_files()?;

        let Some(n) = limit else {
            let mut all = Vec::new();
            for path in &files {
                all.extend(Self::read_lines(path)?);
            }
            return Ok(all);
        };

        // Walk backwards so a tip lookup only touches the newest file.
        let mut newest_first: Vec<Vec<String>> = Vec::new();
        let mut collected = 0;
        for path in files.iter().rev() {
            if collected >= n {
                break;
            }
            let lines = Self::read_lines(path)?;
            collected += lines.len();
            newest_first.push(lines);
        }

        let ordered: Vec<String> = newest_first.into_iter().rev().flatten().collect();
        Ok(take_newest(ordered, limit))
    }

    /// Hash of the newest record that parses, skipping malformed lines
    fn newest_hash(&self) -> Result<Option<String>> {
        for path in self.log_files()?.iter().rev() {
            let found = Self::read_lines(path)?
                .iter()
                .rev()
                .find_map(|raw| peek_hash(raw));
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl StorageAdapter for FileStorage {
    async fn write(&self, entry: &str) -> Result<()> {
        let mut active = self.active.lock().await;
        self.append_line(&mut active, entry)
    }

    async fn read(&self, limit: Option<usize>) -> Result<Vec<String>> {
        self.read_newest(limit)
    }

    async fn compare_and_append(&self, expected_newest: Option<&str>, entry: &str) -> Result<()> {
        let mut active = self.active.lock().await;

        let newest = self.newest_hash()?;
        if newest.as_deref() != expected_newest {
            return Err(ChainLogError::tip_conflict(expected_newest, newest.as_deref()));
        }

        self.append_line(&mut active, entry)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
