//! WebSocket event channel with bounded reconnection.
//!
//! A single channel instance is created per process. `connect()` spawns a
//! background task that keeps the connection alive: on unexpected close it
//! retries with a doubling delay, and after the attempt budget is spent the
//! channel stays down until the process restarts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};

use super::messages::{EventMessage, EventType};
use super::registry::{SubscriberRegistry, Subscription};
use crate::config::ReconnectConfig;
use crate::error::ChannelError;
use crate::notify::{Notifier, PipelineEvent};

/// Backoff schedule for reconnection attempts
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt
    pub initial_delay: Duration,
    /// Attempts after which the channel gives up permanently
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_attempts: config.max_attempts,
        }
    }

    /// Delay before reconnection attempt `attempt` (1-based), doubling each
    /// time. `None` once the budget is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.initial_delay * 2u32.pow(attempt - 1))
    }
}

/// Observable connection state (process-wide, single instance)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub current_backoff_delay: Option<Duration>,
    /// Set once the reconnection budget is spent
    pub exhausted: bool,
}

/// Persistent bidirectional event channel
pub struct EventChannel {
    url: String,
    policy: ReconnectPolicy,
    registry: SubscriberRegistry<EventMessage>,
    state: Arc<Mutex<ConnectionState>>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<EventMessage>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    notifier: Arc<dyn Notifier>,
}

impl EventChannel {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            url: url.into(),
            policy,
            registry: SubscriberRegistry::new(),
            state: Arc::new(Mutex::new(ConnectionState::default())),
            outbound: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
            notifier,
        }
    }

    /// Register a listener for every inbound message; listeners run in
    /// subscription order. The returned subscription is an idempotent
    /// disposer (and also disposes on drop).
    pub fn subscribe(
        &self,
        listener: impl Fn(&EventMessage) + Send + Sync + 'static,
    ) -> Subscription<EventMessage> {
        self.registry.subscribe(listener)
    }

    /// Fire-and-forget send. When disconnected the payload is logged and
    /// dropped; it is never queued for later delivery.
    pub fn send(&self, message: EventMessage) {
        let outbound = self.outbound.lock().expect("outbound lock poisoned");
        match outbound.as_ref() {
            Some(tx) => {
                if tx.send(message).is_err() {
                    warn!("Event channel writer gone, dropping message");
                }
            }
            None => {
                warn!(
                    "{}: dropping {:?} message",
                    ChannelError::NotConnected,
                    message.kind
                );
            }
        }
    }

    /// Snapshot of the connection state
    pub fn state(&self) -> ConnectionState {
        self.state.lock().expect("state lock poisoned").clone()
    }

    /// Start the connection task. Calling connect on an already-running
    /// channel is a no-op, and once the reconnection budget has been
    /// exhausted the channel stays down for the life of the process;
    /// further connect calls are refused.
    pub fn connect(&self) {
        if self.state.lock().expect("state lock poisoned").exhausted {
            warn!("Event channel reconnection budget exhausted, refusing to reconnect");
            return;
        }

        let mut task = self.task.lock().expect("task lock poisoned");
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            warn!("Event channel already connecting");
            return;
        }

        let url = self.url.clone();
        let policy = self.policy.clone();
        let registry = self.registry.clone();
        let state = Arc::clone(&self.state);
        let outbound = Arc::clone(&self.outbound);
        let notifier = Arc::clone(&self.notifier);

        *task = Some(tokio::spawn(async move {
            connection_loop(url, policy, registry, state, outbound, notifier).await;
        }));
    }

    /// Tear the channel down. No reconnection happens after this.
    pub fn disconnect(&self) {
        if let Some(task) = self.task.lock().expect("task lock poisoned").take() {
            task.abort();
        }
        self.outbound.lock().expect("outbound lock poisoned").take();
        let mut state = self.state.lock().expect("state lock poisoned");
        state.connected = false;
        state.current_backoff_delay = None;
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn connection_loop(
    url: String,
    policy: ReconnectPolicy,
    registry: SubscriberRegistry<EventMessage>,
    state: Arc<Mutex<ConnectionState>>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<EventMessage>>>>,
    notifier: Arc<dyn Notifier>,
) {
    let mut attempts: u32 = 0;

    loop {
        info!("Connecting event channel to {}", url);

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                attempts = 0;
                {
                    let mut s = state.lock().expect("state lock poisoned");
                    s.connected = true;
                    s.reconnect_attempts = 0;
                    s.current_backoff_delay = None;
                }
                info!("Event channel connected");
                notifier.notify(PipelineEvent::ChannelConnected);

                let (tx, rx) = mpsc::unbounded_channel();
                outbound
                    .lock()
                    .expect("outbound lock poisoned")
                    .replace(tx);

                run_connection(ws, rx, &registry).await;

                outbound.lock().expect("outbound lock poisoned").take();
                state.lock().expect("state lock poisoned").connected = false;
                warn!("Event channel closed unexpectedly");
                notifier.notify(PipelineEvent::ChannelDisconnected { terminal: false });
            }
            Err(e) => {
                warn!("Event channel connection failed: {}", e);
            }
        }

        attempts += 1;
        match policy.delay_for(attempts) {
            Some(delay) => {
                {
                    let mut s = state.lock().expect("state lock poisoned");
                    s.reconnect_attempts = attempts;
                    s.current_backoff_delay = Some(delay);
                }
                info!(
                    "Reconnecting event channel in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempts,
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                // Terminal: no supervisory restart path until process restart.
                error!(
                    "Event channel reconnection abandoned after {} attempts",
                    policy.max_attempts
                );
                let mut s = state.lock().expect("state lock poisoned");
                s.connected = false;
                s.current_backoff_delay = None;
                s.exhausted = true;
                drop(s);
                notifier.notify(PipelineEvent::ChannelDisconnected { terminal: true });
                return;
            }
        }
    }
}

/// Drive one live connection until it closes or errors.
async fn run_connection(
    ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    mut rx: mpsc::UnboundedReceiver<EventMessage>,
    registry: &SubscriberRegistry<EventMessage>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<EventMessage>(&text) {
                        Ok(message) if message.kind == EventType::Unknown => {
                            warn!("Discarding event with unrecognized tag: {}", text);
                        }
                        Ok(message) => {
                            if message.kind == EventType::Ping {
                                let pong = EventMessage::signal(EventType::Pong);
                                if let Ok(json) = serde_json::to_string(&pong) {
                                    let _ = sink.send(Message::Text(json)).await;
                                }
                            }
                            registry.dispatch(&message);
                        }
                        Err(e) => {
                            warn!("Failed to parse event message: {} ({})", e, text);
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Event channel read error: {}", e);
                    break;
                }
            },
            to_send = rx.recv() => match to_send {
                Some(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize outbound event: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(json)).await {
                        warn!("Event channel write error: {}", e);
                        break;
                    }
                }
                None => break,
            },
        }
    }
}
