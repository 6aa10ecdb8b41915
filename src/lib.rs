pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod notify;
pub mod queue;
pub mod session;
pub mod transcribe;

pub use capture::{
    AudioCaptureState, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureOptions,
    CaptureSession, CaptureSource,
};
pub use config::Config;
pub use context::AppContext;
pub use error::{CaptureError, ChannelError, TranscribeError};
pub use events::{
    ConnectionState, EventChannel, EventMessage, EventType, ReconnectPolicy, SubscriberRegistry,
};
pub use notify::{LogNotifier, Notifier, NullNotifier, PipelineEvent};
pub use queue::{FileInput, FileQueue, FileStatus, QueuePacing, QueueStats, QueuedFile};
pub use session::{RecordingSnapshot, SessionController, SessionPhase};
pub use transcribe::{Transcriber, TranscriptionClient, TranscriptionRequest, TranscriptionResponse};
