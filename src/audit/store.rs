//! Append-only JSONL audit store
//!
//! One JSON object per line, flushed after every append. Writes go through
//! `tokio::fs`; reads run on the blocking pool.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::entry::IntegrityAuditEntry;
use crate::error::BaselineError;
use crate::repository::{AuditStore, RepoResult};

#[derive(Clone)]
pub struct JsonlAuditStore {
    log_path: PathBuf,
    file: Arc<Mutex<Option<tokio::fs::File>>>,
    entry_count: Arc<Mutex<u64>>,
}

impl JsonlAuditStore {
    /// Open or create the log. Synchronous; call it during startup.
    pub fn open(log_path: impl AsRef<Path>) -> Result<Self, BaselineError> {
        let log_path = log_path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BaselineError::AuditError(format!("Failed to create log directory: {}", e))
                })?;
            }
        }

        let existing = load_entries(&log_path)?.len() as u64;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| BaselineError::AuditError(format!("Failed to open audit log file: {}", e)))?;

        info!(
            "Opened audit log {} with {} existing entries",
            log_path.display(),
            existing
        );

        Ok(Self {
            log_path,
            file: Arc::new(Mutex::new(Some(tokio::fs::File::from_std(file)))),
            entry_count: Arc::new(Mutex::new(existing)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub async fn entry_count(&self) -> u64 {
        *self.entry_count.lock().await
    }

    pub async fn all_entries(&self) -> Result<Vec<IntegrityAuditEntry>, BaselineError> {
        let path = self.log_path.clone();
        tokio::task::spawn_blocking(move || load_entries(&path))
            .await
            .map_err(|e| BaselineError::AuditError(format!("Audit log read task failed: {}", e)))?
    }

    pub async fn entries_for_budget(
        &self,
        budget_id: Uuid,
    ) -> Result<Vec<IntegrityAuditEntry>, BaselineError> {
        Ok(self
            .all_entries()
            .await?
            .into_iter()
            .filter(|entry| entry.budget_id == budget_id)
            .collect())
    }

    pub async fn close(&self) -> Result<(), BaselineError> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush().await.map_err(|e| {
                BaselineError::AuditError(format!("Failed to flush audit log on close: {}", e))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &IntegrityAuditEntry) -> RepoResult<()> {
        if !entry.verify_hash() {
            return Err(BaselineError::AuditError(format!(
                "Refusing to append entry {} with invalid hash",
                entry.id
            )));
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| BaselineError::AuditError("Audit log file not available".to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| BaselineError::AuditError(format!("Failed to write to audit log: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| BaselineError::AuditError(format!("Failed to flush audit log: {}", e)))?;
        drop(guard);

        *self.entry_count.lock().await += 1;
        debug!("Appended audit entry: {}", entry.summary());
        Ok(())
    }
}

/// Read every entry of a JSONL audit log. A missing file reads as empty.
pub fn load_entries(path: &Path) -> Result<Vec<IntegrityAuditEntry>, BaselineError> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let file = File::open(path)
        .map_err(|e| BaselineError::AuditError(format!("Failed to open audit log file: {}", e)))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            BaselineError::AuditError(format!("Failed to read line {}: {}", line_num + 1, e))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: IntegrityAuditEntry = serde_json::from_str(&line).map_err(|e| {
            BaselineError::SerializationError(format!(
                "Failed to parse entry at line {}: {}",
                line_num + 1,
                e
            ))
        })?;
        entries.push(entry);
    }

    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}
