use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carepoint_session::autosave::{AutosaveHandle, DraftSink, SaveStatus};
use carepoint_session::config::SessionConfig;
use carepoint_session::notify::{Notification, Notifier, Severity};
use carepoint_storage::error::StorageError;
use tokio::time::{Instant, sleep};

/// Records the offset from `start` of every write, optionally failing.
struct RecordingSink {
    start: Instant,
    writes: Mutex<Vec<u64>>,
    fail: AtomicBool,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            writes: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    fn writes(&self) -> Vec<u64> {
        self.writes.lock().unwrap().clone()
    }
}

impl DraftSink for RecordingSink {
    fn persist(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded {
                key: "draft:u1:opd_visit".to_string(),
                needed: 6_000_000,
                limit: 5_000_000,
            });
        }
        let elapsed = Instant::now().duration_since(self.start).as_secs();
        self.writes.lock().unwrap().push(elapsed);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<Notification>>);

impl RecordingNotifier {
    fn severities(&self) -> Vec<Severity> {
        self.0.lock().unwrap().iter().map(|n| n.severity).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

fn spawn(sink: &Arc<RecordingSink>, notifier: &Arc<RecordingNotifier>) -> AutosaveHandle {
    AutosaveHandle::spawn(
        &SessionConfig::default(),
        sink.clone(),
        notifier.clone(),
    )
}

#[tokio::test(start_paused = true)]
async fn writes_once_after_quiet_window_and_restarts_on_edit() {
    let sink = RecordingSink::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = spawn(&sink, &notifier);
    assert_eq!(handle.status(), SaveStatus::Idle);

    handle.mark_dirty();
    sleep(Duration::from_secs(29)).await;
    assert!(sink.writes().is_empty());

    sleep(Duration::from_secs(2)).await; // t = 31
    assert_eq!(sink.writes(), vec![30]);
    assert_eq!(handle.status(), SaveStatus::Saved);

    handle.mark_dirty();
    sleep(Duration::from_secs(3)).await; // t = 34
    assert_eq!(handle.status(), SaveStatus::Idle);

    sleep(Duration::from_secs(37)).await; // t = 71
    assert_eq!(sink.writes(), vec![30, 61]);
    assert_eq!(handle.status(), SaveStatus::Idle);
    assert_eq!(notifier.severities(), vec![Severity::Info, Severity::Info]);
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_coalesces_into_one_write() {
    let sink = RecordingSink::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = spawn(&sink, &notifier);

    for _ in 0..3 {
        handle.mark_dirty();
        sleep(Duration::from_secs(10)).await;
    }
    // Last edit at t = 20.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(sink.writes(), vec![50]);
}

#[tokio::test(start_paused = true)]
async fn no_write_without_edits() {
    let sink = RecordingSink::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let _handle = spawn(&sink, &notifier);

    sleep(Duration::from_secs(300)).await;
    assert!(sink.writes().is_empty());
    assert!(notifier.severities().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_reported_and_retried_on_next_edit() {
    let sink = RecordingSink::new();
    sink.fail.store(true, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = spawn(&sink, &notifier);

    handle.mark_dirty();
    sleep(Duration::from_secs(31)).await;
    assert!(sink.writes().is_empty());
    assert_eq!(handle.status(), SaveStatus::Idle);
    assert_eq!(notifier.severities(), vec![Severity::Warning]);
    assert!(handle.is_running());

    sink.fail.store(false, Ordering::SeqCst);
    handle.mark_dirty();
    sleep(Duration::from_secs(31)).await;
    assert_eq!(sink.writes(), vec![61]);
}

#[tokio::test(start_paused = true)]
async fn stopping_drops_pending_write() {
    let sink = RecordingSink::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = spawn(&sink, &notifier);

    handle.mark_dirty();
    sleep(Duration::from_secs(10)).await;
    handle.stop();
    sleep(Duration::from_secs(60)).await;
    assert!(sink.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_status_changes() {
    let sink = RecordingSink::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = spawn(&sink, &notifier);
    let mut status = handle.subscribe();

    handle.mark_dirty();
    status.changed().await.unwrap();
    // Saving is replaced by Saved before the receiver wakes.
    assert_eq!(*status.borrow_and_update(), SaveStatus::Saved);
    status.changed().await.unwrap();
    assert_eq!(*status.borrow_and_update(), SaveStatus::Idle);
}
