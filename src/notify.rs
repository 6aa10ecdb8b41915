//! Notification boundary between the pipeline and any presentation layer.
//!
//! The core never renders anything. It hands structured domain events to a
//! [`Notifier`] and assumes nothing about how (or whether) the receiver
//! acts on them.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Domain events emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PipelineEvent {
    RecordingStarted,
    RecordingStopped,
    RecordingCancelled,
    TranscriptionStarted,
    TranscriptionCompleted { text: String },
    TranscriptionError { message: String },
    FileAdded { id: Uuid, name: String },
    FileProcessingStarted { id: Uuid, name: String },
    FileProcessingCompleted { id: Uuid, name: String },
    FileProcessingError { id: Uuid, name: String, message: String },
    QueueCleared,
    ChannelConnected,
    ChannelDisconnected { terminal: bool },
}

/// Receiver for pipeline events (implemented by the presentation layer)
pub trait Notifier: Send + Sync {
    fn notify(&self, event: PipelineEvent);
}

/// Notifier that logs every event via tracing
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: PipelineEvent) {
        info!("pipeline event: {:?}", event);
    }
}

/// Notifier that drops every event
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: PipelineEvent) {}
}
