//! Completion sinks: where a sealed run goes next

use crate::error::{AppError, Result};
use crate::job::JobId;
use crate::models::{ResultEnvelope, RunSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::defaults::DEFAULT_HISTORY_RETENTION;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const INDEX_FILE: &str = "index.json";

/// Receives each sealed run exactly once. Errors are logged by the
/// controller and never change the run.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, job_id: &JobId, envelope: &ResultEnvelope) -> Result<()>;
}

/// What a history file holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub job_id: JobId,
    pub saved_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub results: ResultEnvelope,
}

/// One line of `index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryIndexEntry {
    pub job_id: JobId,
    pub saved_at: DateTime<Utc>,
    pub file: String,
    pub summary: RunSummary,
}

/// Writes one `readiness-<job>-<unix ts>[-site].json` per run and keeps
/// `index.json` newest first. Runs past the retention limit are dropped from
/// the index and their files deleted.
pub struct JsonHistorySink {
    directory: PathBuf,
    site_label: Option<String>,
    retention: usize,
    // Serializes index updates from concurrent runs
    index_lock: Mutex<()>,
}

impl JsonHistorySink {
    pub fn new<P: Into<PathBuf>>(directory: P, site_label: Option<String>) -> Self {
        Self {
            directory: directory.into(),
            site_label,
            retention: DEFAULT_HISTORY_RETENTION,
            index_lock: Mutex::new(()),
        }
    }

    /// Keep at most `runs` runs; at least one is always kept
    pub fn with_retention(mut self, runs: usize) -> Self {
        self.retention = runs.max(1);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE)
    }

    /// Indexed runs, newest first
    pub async fn index(&self) -> Result<Vec<HistoryIndexEntry>> {
        let path = self.index_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| AppError::parse(format!("Malformed history index {}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::io(format!("Failed to read history index {}: {}", path.display(), e))),
        }
    }

    async fn update_index(&self, entry: HistoryIndexEntry) -> Result<()> {
        let _guard = self.index_lock.lock().await;

        let mut index = self.index().await?;
        index.insert(0, entry);
        let expired = if index.len() > self.retention {
            index.split_off(self.retention)
        } else {
            Vec::new()
        };

        let path = self.index_path();
        let content = serde_json::to_string_pretty(&index)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::io(format!("Failed to write history index {}: {}", path.display(), e)))?;

        for old in expired {
            let old_path = self.directory.join(&old.file);
            match tokio::fs::remove_file(&old_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::io(format!(
                        "Failed to prune history file {}: {}",
                        old_path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn file_name(&self, job_id: &JobId, saved_at: DateTime<Utc>) -> String {
        let mut name = format!("readiness-{}-{}", job_id, saved_at.timestamp());
        if let Some(site) = self.site_label.as_deref().map(sanitize).filter(|s| !s.is_empty()) {
            name.push('-');
            name.push_str(&site);
        }
        name.push_str(".json");
        name
    }

    /// History files in the directory, newest first
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_history = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("readiness-") && n.ends_with(".json"))
                .unwrap_or(false);
            if is_history {
                let modified = entry.metadata().await?.modified()?;
                files.push((modified, path));
            }
        }

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    pub async fn load(path: &Path) -> Result<HistoryRecord> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::io(format!("Failed to read history file {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn sanitize(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl CompletionSink for JsonHistorySink {
    fn name(&self) -> &str {
        "json-history"
    }

    async fn complete(&self, job_id: &JobId, envelope: &ResultEnvelope) -> Result<()> {
        let saved_at = Utc::now();
        let record = HistoryRecord {
            job_id: job_id.clone(),
            saved_at,
            summary: envelope.summary(),
            results: envelope.clone(),
        };

        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            AppError::io(format!(
                "Failed to create history directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let file = self.file_name(job_id, saved_at);
        let path = self.directory.join(&file);
        let content = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AppError::io(format!("Failed to write history file {}: {}", path.display(), e)))?;

        self.update_index(HistoryIndexEntry {
            job_id: job_id.clone(),
            saved_at,
            file,
            summary: record.summary,
        })
        .await
    }
}
