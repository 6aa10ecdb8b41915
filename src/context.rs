//! Application wiring: the per-process singletons are explicit service
//! objects constructed here and passed around, never implicitly-imported
//! globals. This keeps every component constructible in isolation for
//! tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::events::{EventChannel, EventMessage, EventType, ReconnectPolicy, Subscription};
use crate::notify::Notifier;
use crate::queue::{FileQueue, QueuePacing};
use crate::session::SessionController;
use crate::transcribe::TranscriptionClient;

pub struct AppContext {
    pub config: Config,
    pub notifier: Arc<dyn Notifier>,
    pub transcriber: Arc<TranscriptionClient>,
    pub session: Arc<SessionController>,
    pub queue: Arc<FileQueue>,
    pub channel: Arc<EventChannel>,
    /// Keeps the channel→session routing alive for the context's lifetime
    _session_routing: Subscription<EventMessage>,
}

impl AppContext {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let transcriber = Arc::new(TranscriptionClient::from_config(&config.transcription));

        let session = Arc::new(SessionController::new(
            transcriber.clone(),
            notifier.clone(),
        ));

        let pacing = QueuePacing {
            drain_delay: Duration::from_millis(config.queue.drain_delay_ms),
            ..QueuePacing::default()
        };
        let queue = Arc::new(FileQueue::new(
            transcriber.clone(),
            notifier.clone(),
            pacing,
        ));

        let channel = Arc::new(EventChannel::new(
            config.events.url.clone(),
            ReconnectPolicy::from_config(&config.events.reconnect),
            notifier.clone(),
        ));

        // Inbound transcription events from the remote server are reflected
        // into the recording session's observable state.
        let routed = Arc::clone(&session);
        let session_routing =
            channel.subscribe(move |message| apply_session_event(&routed, message));

        Self {
            config,
            notifier,
            transcriber,
            session,
            queue,
            channel,
            _session_routing: session_routing,
        }
    }
}

/// Reflect one inbound channel message into the recording session.
///
/// Progress updates carry `{progress, status?}`; errors carry `{message}`.
/// Tags that describe model or container state are left to other
/// subscribers.
pub fn apply_session_event(session: &SessionController, message: &EventMessage) {
    match message.kind {
        EventType::TranscriptionProgress => {
            let pct = message.data["progress"].as_i64().unwrap_or(0);
            let status = message.data["status"].as_str();
            session.update_progress(pct, status);
        }
        EventType::TranscriptionCompleted => {
            session.complete_transcription();
        }
        EventType::TranscriptionError => {
            let detail = message.data["message"]
                .as_str()
                .unwrap_or("Transcription failed");
            session.fail(detail);
        }
        _ => {}
    }
}
