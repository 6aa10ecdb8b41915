use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one queued file; transitions are strictly
/// Pending → Processing → {Completed | Error}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// A file awaiting or undergoing transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedFile {
    pub id: Uuid,
    pub name: String,
    /// Size in bytes
    pub size: u64,
    pub status: FileStatus,
    /// 0-100
    pub progress: u8,
    /// Transcript text on success
    pub result: Option<String>,
    /// Failure message; also set on user cancellation
    pub error: Option<String>,
    pub added_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input handed to `add_files`
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub size: u64,
    pub audio: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, audio: Vec<u8>) -> Self {
        let name = name.into();
        let size = audio.len() as u64;
        Self { name, size, audio }
    }
}

/// Per-status counts plus the sum of all file sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_bytes: u64,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}
