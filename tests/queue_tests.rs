// Integration tests for the file queue processor
//
// These tests verify FIFO draining, the single-Processing invariant,
// dedup on (name, size), cooperative cancellation, and per-item error
// isolation, driven by a stub transcriber.

use std::sync::Arc;
use std::time::Duration;

use voxline::error::TranscribeError;
use voxline::{
    FileInput, FileQueue, FileStatus, NullNotifier, QueuePacing, Transcriber,
    TranscriptionRequest, TranscriptionResponse,
};

struct StubTranscriber {
    delay: Duration,
    fail_names: Vec<String>,
}

impl StubTranscriber {
    fn instant() -> Self {
        Self {
            delay: Duration::from_millis(0),
            fail_names: Vec::new(),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            fail_names: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscribeError> {
        tokio::time::sleep(self.delay).await;
        if self.fail_names.contains(&request.file_name) {
            return Err(TranscribeError::Remote {
                detail: format!("cannot decode {}", request.file_name),
            });
        }
        Ok(TranscriptionResponse {
            text: format!("transcript of {}", request.file_name),
            language: Some("en".to_string()),
            duration: Some(1.0),
            segments: Vec::new(),
        })
    }
}

fn fast_pacing() -> QueuePacing {
    QueuePacing {
        stage_delay: Duration::from_millis(2),
        drain_delay: Duration::from_millis(20),
    }
}

fn make_queue(transcriber: StubTranscriber, pacing: QueuePacing) -> Arc<FileQueue> {
    Arc::new(FileQueue::new(
        Arc::new(transcriber),
        Arc::new(NullNotifier),
        pacing,
    ))
}

/// Poll until the predicate holds or the deadline passes
async fn wait_for<F: Fn() -> bool>(what: &str, predicate: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_add_files_dedups_on_name_and_size() {
    let queue = make_queue(StubTranscriber::instant(), fast_pacing());

    let first = queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 100]),
        FileInput::new("b.wav", vec![0u8; 200]),
    ]);
    assert_eq!(first.len(), 2);

    // Same name + size: silently skipped. Same name, new size: added.
    let second = queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 100]),
        FileInput::new("a.wav", vec![0u8; 300]),
    ]);
    assert_eq!(second.len(), 1);

    let files = queue.files();
    assert_eq!(files.len(), 3);
    let dupes = files
        .iter()
        .filter(|f| f.name == "a.wav" && f.size == 100)
        .count();
    assert_eq!(dupes, 1);
}

#[tokio::test]
async fn test_single_processing_invariant() {
    let queue = make_queue(
        StubTranscriber::slow(Duration::from_millis(100)),
        QueuePacing {
            stage_delay: Duration::from_millis(10),
            drain_delay: Duration::from_millis(200),
        },
    );

    queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 10 * 1024]),
        FileInput::new("b.wav", vec![0u8; 20 * 1024]),
    ]);

    let drain = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.process_next().await })
    };

    wait_for("a.wav to start processing", || {
        queue.stats().processing == 1
    })
    .await;

    // A second call while A is Processing is a no-op
    queue.process_next().await;
    assert_eq!(queue.stats().processing, 1);

    // Upon A's success (and before the drain delay elapses): B still pending
    wait_for("a.wav to complete", || queue.stats().completed == 1).await;
    let stats = queue.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.processing, 0);

    drain.await.unwrap();
    let stats = queue.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_remove_file_refuses_processing_entry() {
    let queue = make_queue(
        StubTranscriber::slow(Duration::from_millis(200)),
        fast_pacing(),
    );

    let ids = queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 100]),
        FileInput::new("b.wav", vec![0u8; 100]),
    ]);

    let drain = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.process_next().await })
    };
    wait_for("processing to start", || queue.stats().processing == 1).await;

    // Processing entry stays put
    assert!(!queue.remove_file(ids[0]));
    let entry = queue.get(ids[0]).unwrap();
    assert_eq!(entry.status, FileStatus::Processing);

    // Pending entry can be removed
    assert!(queue.remove_file(ids[1]));
    assert!(queue.get(ids[1]).is_none());

    // Unknown id
    assert!(!queue.remove_file(uuid::Uuid::new_v4()));

    drain.await.unwrap();
}

#[tokio::test]
async fn test_cancel_processing_moves_on_to_next_file() {
    let queue = make_queue(
        StubTranscriber::slow(Duration::from_millis(300)),
        fast_pacing(),
    );

    let ids = queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 100]),
        FileInput::new("b.wav", vec![0u8; 100]),
    ]);

    let drain = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.process_next().await })
    };
    wait_for("a.wav to start processing", || {
        queue
            .get(ids[0])
            .is_some_and(|f| f.status == FileStatus::Processing)
    })
    .await;

    assert!(queue.cancel_processing());

    let cancelled = queue.get(ids[0]).unwrap();
    assert_eq!(cancelled.status, FileStatus::Error);
    assert_eq!(cancelled.error.as_deref(), Some("Cancelled by user"));

    // The released marker lets the drain pick up B
    drain.await.unwrap();
    queue.process_next().await;

    let b = queue.get(ids[1]).unwrap();
    assert_eq!(b.status, FileStatus::Completed);

    // The in-flight response for A was ignored, not applied late
    let a = queue.get(ids[0]).unwrap();
    assert_eq!(a.status, FileStatus::Error);
    assert!(a.result.is_none());

    // Nothing left to cancel
    assert!(!queue.cancel_processing());
}

#[tokio::test]
async fn test_failed_item_does_not_stop_the_queue() {
    let queue = make_queue(
        StubTranscriber {
            delay: Duration::from_millis(0),
            fail_names: vec!["bad.wav".to_string()],
        },
        fast_pacing(),
    );

    let ids = queue.add_files(vec![
        FileInput::new("bad.wav", vec![0u8; 100]),
        FileInput::new("good.wav", vec![0u8; 100]),
    ]);

    queue.process_next().await;

    let bad = queue.get(ids[0]).unwrap();
    assert_eq!(bad.status, FileStatus::Error);
    assert!(bad.error.unwrap().contains("cannot decode"));

    let good = queue.get(ids[1]).unwrap();
    assert_eq!(good.status, FileStatus::Completed);
    assert_eq!(good.result.as_deref(), Some("transcript of good.wav"));
    assert_eq!(good.progress, 100);
}

#[tokio::test]
async fn test_stats_count_statuses_and_bytes() {
    let queue = make_queue(StubTranscriber::instant(), fast_pacing());

    queue.add_files(vec![
        FileInput::new("a.wav", vec![0u8; 1000]),
        FileInput::new("b.wav", vec![0u8; 2000]),
    ]);

    let stats = queue.stats();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.total_bytes, 3000);
    assert_eq!(stats.total(), 2);

    queue.process_next().await;
    let stats = queue.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.total_bytes, 3000);
}

#[tokio::test]
async fn test_clear_empties_the_queue() {
    let queue = make_queue(StubTranscriber::instant(), fast_pacing());

    queue.add_files(vec![FileInput::new("a.wav", vec![0u8; 100])]);
    assert_eq!(queue.files().len(), 1);

    queue.clear();
    assert!(queue.files().is_empty());
    assert_eq!(queue.stats().total(), 0);

    // Draining an empty queue is a no-op
    queue.process_next().await;
}
