//! FIFO file queue drained strictly one file at a time.
//!
//! One-at-a-time draining is a deliberate bounded-concurrency policy so the
//! transcription server is never handed more than one file; there is no
//! worker pool. Exclusivity is enforced by status checks under the entries
//! lock: at most one entry is ever Processing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::item::{FileInput, FileStatus, QueueStats, QueuedFile};
use crate::notify::{Notifier, PipelineEvent};
use crate::transcribe::{Transcriber, TranscriptionRequest};

/// Error message recorded when the user cancels the in-flight file
pub const CANCELLED_BY_USER: &str = "Cancelled by user";

/// Progress checkpoints an item walks through before the transcription call
const PROGRESS_STAGES: [u8; 5] = [10, 30, 55, 75, 90];

/// Pacing knobs for staged progress and between-item delay
#[derive(Debug, Clone)]
pub struct QueuePacing {
    pub stage_delay: Duration,
    pub drain_delay: Duration,
}

impl Default for QueuePacing {
    fn default() -> Self {
        Self {
            stage_delay: Duration::from_millis(150),
            drain_delay: Duration::from_millis(500),
        }
    }
}

struct Entry {
    file: QueuedFile,
    audio: Vec<u8>,
}

pub struct FileQueue {
    entries: Mutex<Vec<Entry>>,
    transcriber: Arc<dyn Transcriber>,
    notifier: Arc<dyn Notifier>,
    pacing: QueuePacing,
}

impl FileQueue {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        notifier: Arc<dyn Notifier>,
        pacing: QueuePacing,
    ) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            transcriber,
            notifier,
            pacing,
        }
    }

    /// Append files as Pending, skipping silently any input whose name and
    /// size match an existing entry. Returns the ids assigned to the files
    /// that were actually added.
    pub fn add_files(&self, inputs: Vec<FileInput>) -> Vec<Uuid> {
        let mut added = Vec::new();
        {
            let mut entries = self.entries.lock().expect("queue lock poisoned");
            for input in inputs {
                let duplicate = entries
                    .iter()
                    .any(|e| e.file.name == input.name && e.file.size == input.size);
                if duplicate {
                    continue;
                }

                let id = Uuid::new_v4();
                entries.push(Entry {
                    file: QueuedFile {
                        id,
                        name: input.name.clone(),
                        size: input.size,
                        status: FileStatus::Pending,
                        progress: 0,
                        result: None,
                        error: None,
                        added_at: Utc::now(),
                        started_at: None,
                        completed_at: None,
                    },
                    audio: input.audio,
                });
                added.push((id, input.name));
            }
        }

        for (id, name) in &added {
            self.notifier.notify(PipelineEvent::FileAdded {
                id: *id,
                name: name.clone(),
            });
        }
        added.into_iter().map(|(id, _)| id).collect()
    }

    /// Remove an entry. Returns false without mutation when the entry is
    /// Processing (or unknown).
    pub fn remove_file(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        match entries.iter().position(|e| e.file.id == id) {
            Some(idx) if entries[idx].file.status == FileStatus::Processing => false,
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Empty the collection. Does not cancel asynchronous work already in
    /// flight; call [`FileQueue::cancel_processing`] first for a clean stop.
    pub fn clear(&self) {
        self.entries.lock().expect("queue lock poisoned").clear();
        info!("Queue cleared");
        self.notifier.notify(PipelineEvent::QueueCleared);
    }

    /// Mark the current Processing entry as cancelled and release the
    /// processing marker so the next drain may proceed. The in-flight
    /// request itself is not aborted (cooperative cancellation); its
    /// eventual response is ignored.
    pub fn cancel_processing(&self) -> bool {
        let cancelled = {
            let mut entries = self.entries.lock().expect("queue lock poisoned");
            entries
                .iter_mut()
                .find(|e| e.file.status == FileStatus::Processing)
                .map(|e| {
                    e.file.status = FileStatus::Error;
                    e.file.error = Some(CANCELLED_BY_USER.to_string());
                    e.file.completed_at = Some(Utc::now());
                    (e.file.id, e.file.name.clone())
                })
        };

        match cancelled {
            Some((id, name)) => {
                info!("Cancelled processing of {}", name);
                self.notifier.notify(PipelineEvent::FileProcessingError {
                    id,
                    name,
                    message: CANCELLED_BY_USER.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// Drain pending entries one at a time in insertion order. A no-op when
    /// an entry is already Processing. Per-item failures are isolated: an
    /// errored file never stops the rest of the queue.
    pub async fn process_next(&self) {
        loop {
            let (id, name, audio) = match self.claim_next() {
                Some(claim) => claim,
                None => return,
            };

            info!("Processing {} ({})", name, id);
            self.notifier.notify(PipelineEvent::FileProcessingStarted {
                id,
                name: name.clone(),
            });

            for &pct in PROGRESS_STAGES.iter() {
                tokio::time::sleep(self.pacing.stage_delay).await;
                if !self.set_progress(id, pct) {
                    // Entry was cancelled or removed mid-flight
                    break;
                }
            }

            if self.is_processing(id) {
                let request = TranscriptionRequest {
                    audio,
                    file_name: name.clone(),
                    model: None,
                    response_format: "json".to_string(),
                };
                match self.transcriber.transcribe(request).await {
                    Ok(response) => {
                        if self.complete_item(id, response.text) {
                            info!("Completed {}", name);
                            self.notifier.notify(PipelineEvent::FileProcessingCompleted {
                                id,
                                name: name.clone(),
                            });
                        }
                    }
                    Err(e) => {
                        let message = e.to_string();
                        if self.fail_item(id, &message) {
                            warn!("Failed to process {}: {}", name, message);
                            self.notifier.notify(PipelineEvent::FileProcessingError {
                                id,
                                name: name.clone(),
                                message,
                            });
                        }
                    }
                }
            }

            if !self.has_pending() {
                return;
            }
            tokio::time::sleep(self.pacing.drain_delay).await;
        }
    }

    /// Counts per status plus total bytes
    pub fn stats(&self) -> QueueStats {
        let entries = self.entries.lock().expect("queue lock poisoned");
        let mut stats = QueueStats::default();
        for entry in entries.iter() {
            match entry.file.status {
                FileStatus::Pending => stats.pending += 1,
                FileStatus::Processing => stats.processing += 1,
                FileStatus::Completed => stats.completed += 1,
                FileStatus::Error => stats.failed += 1,
            }
            stats.total_bytes += entry.file.size;
        }
        stats
    }

    /// Snapshot of all entries in insertion order
    pub fn files(&self) -> Vec<QueuedFile> {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .iter()
            .map(|e| e.file.clone())
            .collect()
    }

    pub fn get(&self, id: Uuid) -> Option<QueuedFile> {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .iter()
            .find(|e| e.file.id == id)
            .map(|e| e.file.clone())
    }

    /// Claim the oldest Pending entry; None when the queue is empty of
    /// pending work or another entry is already Processing.
    fn claim_next(&self) -> Option<(Uuid, String, Vec<u8>)> {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        if entries
            .iter()
            .any(|e| e.file.status == FileStatus::Processing)
        {
            return None;
        }
        let entry = entries
            .iter_mut()
            .find(|e| e.file.status == FileStatus::Pending)?;
        entry.file.status = FileStatus::Processing;
        entry.file.progress = 0;
        entry.file.started_at = Some(Utc::now());
        Some((entry.file.id, entry.file.name.clone(), entry.audio.clone()))
    }

    /// Returns false when the entry is no longer Processing
    fn set_progress(&self, id: Uuid, pct: u8) -> bool {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        match entries
            .iter_mut()
            .find(|e| e.file.id == id && e.file.status == FileStatus::Processing)
        {
            Some(entry) => {
                entry.file.progress = pct.min(100);
                true
            }
            None => false,
        }
    }

    fn is_processing(&self, id: Uuid) -> bool {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .iter()
            .any(|e| e.file.id == id && e.file.status == FileStatus::Processing)
    }

    fn complete_item(&self, id: Uuid, text: String) -> bool {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        match entries
            .iter_mut()
            .find(|e| e.file.id == id && e.file.status == FileStatus::Processing)
        {
            Some(entry) => {
                entry.file.status = FileStatus::Completed;
                entry.file.progress = 100;
                entry.file.result = Some(text);
                entry.file.completed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    fn fail_item(&self, id: Uuid, message: &str) -> bool {
        let mut entries = self.entries.lock().expect("queue lock poisoned");
        match entries
            .iter_mut()
            .find(|e| e.file.id == id && e.file.status == FileStatus::Processing)
        {
            Some(entry) => {
                entry.file.status = FileStatus::Error;
                entry.file.error = Some(message.to_string());
                entry.file.completed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    fn has_pending(&self) -> bool {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .iter()
            .any(|e| e.file.status == FileStatus::Pending)
    }
}
