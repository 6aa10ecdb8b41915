//! Microphone capture backend over cpal.
//!
//! cpal's `Stream` is not `Send`, so the stream lives on a dedicated thread
//! for the lifetime of the capture; frames are forwarded into a tokio
//! channel. Dropping the stream (thread exit) releases the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureOptions};
use crate::error::CaptureError;

/// Frame cadence for forwarding buffered samples
const FRAME_INTERVAL_MS: u64 = 100;

pub struct MicBackend {
    options: CaptureOptions,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicBackend {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::AlreadyRecording);
        }

        if self.options.echo_cancellation || self.options.noise_suppression {
            // cpal exposes no processing knobs; the request is recorded in
            // the options but applied only where the OS does it for us.
            info!("Echo cancellation / noise suppression left to the OS audio stack");
        }

        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);
        let options = self.options.clone();

        let thread = std::thread::Builder::new()
            .name("voxline-capture".to_string())
            .spawn(move || capture_thread(options, frame_tx, stop_flag, ready_tx))
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        self.thread = Some(thread);

        // Wait for the thread to report device acquisition
        match ready_rx.await {
            Ok(Ok(())) => {
                self.capturing = true;
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.join_thread().await;
                Err(e)
            }
            Err(_) => {
                self.join_thread().await;
                Err(CaptureError::Stream("capture thread died during startup".to_string()))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.join_thread().await;
        self.capturing = false;
        info!("Microphone capture stopped, device released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicBackend {
    fn drop(&mut self) {
        // The capture thread polls this flag at frame cadence; on its way
        // out it drops the cpal stream, which releases the device.
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

impl MicBackend {
    async fn join_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || {
                if thread.join().is_err() {
                    warn!("Capture thread panicked");
                }
            })
            .await;
        }
    }
}

/// Owns the cpal stream for the duration of the capture.
fn capture_thread(
    options: CaptureOptions,
    frame_tx: mpsc::Sender<AudioFrame>,
    stop_flag: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(
                "no default input device".to_string(),
            )));
            return;
        }
    };

    let supported = match device.default_input_config() {
        Ok(supported) => supported,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::PermissionDenied(e.to_string())));
            return;
        }
    };

    let config = StreamConfig {
        channels: options.channel_count,
        sample_rate: cpal::SampleRate(options.sample_rate),
        buffer_size: BufferSize::Default,
    };

    // Samples land here from the realtime callback; the loop below drains
    // them into frames off the audio thread.
    let pending: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&pending)),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&pending)),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&pending)),
        other => Err(CaptureError::Stream(format!(
            "unsupported sample format: {:?}",
            other
        ))),
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    let started = Instant::now();
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(FRAME_INTERVAL_MS));

        let samples: Vec<i16> = {
            let mut pending = pending.lock().expect("pending samples lock poisoned");
            std::mem::take(&mut *pending)
        };
        if samples.is_empty() {
            continue;
        }

        let frame = AudioFrame {
            samples,
            sample_rate: options.sample_rate,
            channels: options.channel_count,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };
        if frame_tx.blocking_send(frame).is_err() {
            // Receiver gone; nothing left to capture for
            break;
        }
    }

    // Dropping the stream releases the device handle
    drop(stream);
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    pending: Arc<Mutex<Vec<i16>>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let err_fn = |err| {
        // Non-fatal buffer timing errors are common on Linux
        warn!("Audio stream error: {}", err);
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> =
                    data.iter().map(|&s| cpal::Sample::from_sample(s)).collect();
                pending
                    .lock()
                    .expect("pending samples lock poisoned")
                    .extend_from_slice(&converted);
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::Stream(e.to_string()))
}
