// Integration tests for the recording session state machine
//
// These tests drive the Idle → Recording → Transcribing lifecycle with a
// stub transcriber and verify the round-trip, clamping, revert, and error
// propagation behavior. Paused tokio time makes the 1 Hz tick and the 2 s
// status revert deterministic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use voxline::error::TranscribeError;
use voxline::session::{COMPLETED_STATUS, READY_STATUS};
use voxline::{
    Notifier, PipelineEvent, SessionController, Transcriber, TranscriptionRequest,
    TranscriptionResponse,
};

struct StubTranscriber {
    fail: bool,
}

#[async_trait::async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(
        &self,
        _request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscribeError> {
        if self.fail {
            return Err(TranscribeError::Remote {
                detail: "model not loaded".to_string(),
            });
        }
        Ok(TranscriptionResponse {
            text: "hello world".to_string(),
            language: Some("en".to_string()),
            duration: Some(0.5),
            segments: Vec::new(),
        })
    }
}

struct SlowTranscriber;

#[async_trait::async_trait]
impl Transcriber for SlowTranscriber {
    async fn transcribe(
        &self,
        _request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscribeError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(TranscriptionResponse {
            text: "slow result".to_string(),
            language: None,
            duration: None,
            segments: Vec::new(),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<PipelineEvent>>);

impl RecordingNotifier {
    fn events(&self) -> Vec<PipelineEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: PipelineEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn make_controller(fail: bool) -> (SessionController, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = SessionController::new(
        Arc::new(StubTranscriber { fail }),
        notifier.clone(),
    );
    (controller, notifier)
}

#[tokio::test]
async fn test_start_then_cancel_round_trips_to_initial_shape() {
    let (controller, _) = make_controller(false);

    let initial = controller.snapshot();
    controller.start();

    let recording = controller.snapshot();
    assert!(recording.is_active);
    assert!(!recording.is_transcribing);
    assert!(recording.started_at.is_some());

    controller.cancel();

    let after = controller.snapshot();
    assert!(!after.is_active);
    assert!(!after.is_transcribing);
    assert_eq!(after.duration_secs, 0);
    assert_eq!(after.transcription_progress, 0);
    assert_eq!(after.status_text, initial.status_text);
    assert_eq!(after.status_text, READY_STATUS);
}

#[tokio::test]
async fn test_active_and_transcribing_are_never_both_set() {
    let (controller, _) = make_controller(false);

    controller.start();
    let s = controller.snapshot();
    assert!(s.is_active && !s.is_transcribing);

    controller.stop();
    let s = controller.snapshot();
    assert!(!s.is_active && s.is_transcribing);
    assert_eq!(s.transcription_progress, 0);

    controller.cancel();
    let s = controller.snapshot();
    assert!(!s.is_active && !s.is_transcribing);
}

#[tokio::test(start_paused = true)]
async fn test_duration_ticks_at_one_hertz_while_recording() {
    let (controller, _) = make_controller(false);

    controller.start();
    tokio::time::sleep(Duration::from_millis(3100)).await;

    let s = controller.snapshot();
    assert_eq!(s.duration_secs, 3);

    // Tick halts once recording stops
    controller.stop();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(controller.snapshot().duration_secs, 3);
}

#[tokio::test]
async fn test_update_progress_clamps_to_bounds() {
    let (controller, _) = make_controller(false);

    controller.start();
    controller.stop();

    controller.update_progress(150, None);
    assert_eq!(controller.snapshot().transcription_progress, 100);

    controller.update_progress(-10, Some("Loading model"));
    let s = controller.snapshot();
    assert_eq!(s.transcription_progress, 0);
    assert_eq!(s.status_text, "Loading model");

    controller.update_progress(42, None);
    assert_eq!(controller.snapshot().transcription_progress, 42);
}

#[tokio::test]
async fn test_update_progress_ignored_outside_transcribing() {
    let (controller, _) = make_controller(false);

    controller.update_progress(50, Some("should not land"));
    let s = controller.snapshot();
    assert_eq!(s.transcription_progress, 0);
    assert_eq!(s.status_text, READY_STATUS);

    controller.start();
    controller.update_progress(50, None);
    assert_eq!(controller.snapshot().transcription_progress, 0);
    controller.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_completion_status_reverts_after_display_window() {
    let (controller, _) = make_controller(false);

    controller.start();
    controller.stop();
    controller.complete_transcription();

    let s = controller.snapshot();
    assert!(!s.is_transcribing);
    assert_eq!(s.status_text, COMPLETED_STATUS);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(controller.snapshot().status_text, READY_STATUS);
}

#[tokio::test(start_paused = true)]
async fn test_transcribe_blob_success() {
    let (controller, notifier) = make_controller(false);

    controller.start();
    let text = controller
        .transcribe_blob(vec![0u8; 64])
        .await
        .expect("transcription should succeed");
    assert_eq!(text, "hello world");

    let s = controller.snapshot();
    assert!(!s.is_active && !s.is_transcribing);

    let events = notifier.events();
    assert!(events.contains(&PipelineEvent::RecordingStarted));
    assert!(events.contains(&PipelineEvent::RecordingStopped));
    assert!(events.contains(&PipelineEvent::TranscriptionStarted));
    assert!(events.contains(&PipelineEvent::TranscriptionCompleted {
        text: "hello world".to_string()
    }));
}

#[tokio::test]
async fn test_transcribe_blob_failure_surfaces_in_state_and_rethrows() {
    let (controller, notifier) = make_controller(true);

    controller.start();
    let err = controller
        .transcribe_blob(vec![0u8; 64])
        .await
        .expect_err("transcription should fail");
    assert!(err.to_string().contains("model not loaded"));

    // Recovered locally into visible state, and rethrown to the caller
    let s = controller.snapshot();
    assert!(!s.is_active && !s.is_transcribing);
    assert!(s.status_text.contains("model not loaded"));
    assert_eq!(s.transcription_progress, 0);

    let events = notifier.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::TranscriptionError { .. })));
}

#[tokio::test]
async fn test_transcribe_blob_from_idle_applies_stop_semantics() {
    let (controller, _) = make_controller(false);

    // No recording in progress: the blob still flows through Transcribing
    let text = controller.transcribe_blob(vec![0u8; 16]).await.unwrap();
    assert_eq!(text, "hello world");
    let s = controller.snapshot();
    assert!(!s.is_active && !s.is_transcribing);
}

#[tokio::test]
async fn test_overlapping_transcriptions_are_rejected() {
    let controller = Arc::new(SessionController::new(
        Arc::new(SlowTranscriber),
        Arc::new(RecordingNotifier::default()),
    ));

    let racing = Arc::clone(&controller);
    let first = tokio::spawn(async move { racing.transcribe_blob(vec![0u8; 32]).await });

    // Wait until the first blob is mid-flight
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !controller.snapshot().is_transcribing {
        assert!(
            tokio::time::Instant::now() < deadline,
            "first blob never entered transcription"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = controller
        .transcribe_blob(vec![0u8; 32])
        .await
        .expect_err("second blob should be rejected");
    assert!(matches!(err, TranscribeError::AlreadyRunning));

    // The running submission is untouched and still completes
    let text = first.await.unwrap().expect("first blob should finish");
    assert_eq!(text, "slow result");
    assert!(!controller.snapshot().is_transcribing);
}

#[tokio::test]
async fn test_fail_resets_any_state_to_idle_with_message() {
    let (controller, _) = make_controller(false);

    controller.start();
    controller.fail("Microphone unplugged");

    let s = controller.snapshot();
    assert!(!s.is_active && !s.is_transcribing);
    assert_eq!(s.status_text, "Microphone unplugged");
    assert_eq!(s.duration_secs, 0);
}
