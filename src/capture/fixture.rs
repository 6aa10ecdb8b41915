//! Fixture capture backend: replays in-memory frames as if captured live.
//! Used by tests and batch flows that bypass the microphone.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::backend::{AudioFrame, CaptureBackend};
use crate::error::CaptureError;

pub struct FixtureBackend {
    frames: Vec<AudioFrame>,
    handle: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FixtureBackend {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            handle: None,
            capturing: false,
        }
    }
}

impl Drop for FixtureBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FixtureBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::AlreadyRecording);
        }

        let (tx, rx) = mpsc::channel(32);
        let frames = self.frames.clone();

        self.handle = Some(tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
                // Small pacing so consumers observe a live-like stream
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
        }));
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(handle) = self.handle.take() {
            // Let delivery finish so accumulated samples are complete
            let _ = handle.await;
        }
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
