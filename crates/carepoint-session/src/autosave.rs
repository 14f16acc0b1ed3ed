use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use carepoint_storage::error::StorageError;

use crate::config::SessionConfig;
use crate::notify::{Notification, Notifier, Severity};

/// What the autosave indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
}

/// Writes the current draft. Called from the autosave task.
pub trait DraftSink: Send + Sync {
    fn persist(&self) -> Result<(), StorageError>;
}

/// Handle to a running debounced autosave task.
///
/// Every [`mark_dirty`](Self::mark_dirty) restarts the quiet window; the
/// draft is written once the window elapses with no further edits.
/// Dropping the handle stops the task.
pub struct AutosaveHandle {
    edits: mpsc::UnboundedSender<()>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Start the autosave task on the current tokio runtime.
    pub fn spawn(
        config: &SessionConfig,
        sink: Arc<dyn DraftSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (edits, edit_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let task = tokio::spawn(run(
            edit_rx,
            status_tx,
            sink,
            notifier,
            config.autosave_debounce,
            config.saved_display,
        ));
        Self {
            edits,
            status,
            task,
        }
    }

    /// Record an edit. Never blocks.
    pub fn mark_dirty(&self) {
        // A closed channel means the task is gone; the edit stays in memory.
        let _ = self.edits.send(());
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the task. Any pending save is dropped.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut edits: mpsc::UnboundedReceiver<()>,
    status: watch::Sender<SaveStatus>,
    sink: Arc<dyn DraftSink>,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    saved_display: Duration,
) {
    // `save_at` is the dirty flag: set while an unsaved edit is pending.
    let mut save_at: Option<Instant> = None;
    let mut idle_at: Option<Instant> = None;

    loop {
        tokio::select! {
            edit = edits.recv() => match edit {
                Some(()) => save_at = Some(Instant::now() + debounce),
                None => break,
            },
            _ = tokio::time::sleep_until(save_at.unwrap_or_else(Instant::now)), if save_at.is_some() => {
                save_at = None;
                status.send_replace(SaveStatus::Saving);
                match sink.persist() {
                    Ok(()) => {
                        debug!("autosave wrote draft");
                        status.send_replace(SaveStatus::Saved);
                        idle_at = Some(Instant::now() + saved_display);
                        notifier.notify(Notification::new(
                            Severity::Info,
                            "Draft saved",
                            "Your progress has been saved.",
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "autosave failed, edits remain in memory");
                        status.send_replace(SaveStatus::Idle);
                        idle_at = None;
                        notifier.notify(Notification::new(
                            Severity::Warning,
                            "Draft not saved",
                            format!("Could not save your progress: {e}"),
                        ));
                    }
                }
            },
            _ = tokio::time::sleep_until(idle_at.unwrap_or_else(Instant::now)), if idle_at.is_some() => {
                idle_at = None;
                status.send_replace(SaveStatus::Idle);
            },
        }
    }
    debug!("autosave task stopped");
}
