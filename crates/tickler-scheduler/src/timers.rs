//! The timer table: one armed delivery task per reminder id.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Explicit map from reminder id to its armed tokio task.
///
/// [`arm`](TimerTable::arm) always cancels any previously armed task for the
/// same id before spawning a new one, so rescheduling can never produce a
/// duplicate firing. When a task's sleep elapses it sends the reminder id on
/// the due channel; the engine loop does the recompute and re-arm.
pub struct TimerTable {
    tasks: HashMap<String, JoinHandle<()>>,
    due_tx: mpsc::Sender<String>,
}

impl TimerTable {
    pub fn new(due_tx: mpsc::Sender<String>) -> Self {
        Self {
            tasks: HashMap::new(),
            due_tx,
        }
    }

    /// Arm (or re-arm) the delivery task for `id`, firing at `due`.
    ///
    /// A due instant at or before `now` is not armed; the engine recomputes
    /// a strictly-future instant on the next lifecycle event anyway.
    pub fn arm(&mut self, id: &str, due: NaiveDateTime, now: NaiveDateTime) {
        self.cancel(id);

        let Ok(delay) = (due - now).to_std() else {
            debug!(reminder_id = %id, %due, "due instant already passed; not arming");
            return;
        };

        let tx = self.due_tx.clone();
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(task_id.clone()).await.is_err() {
                warn!(reminder_id = %task_id, "due channel closed; firing dropped");
            }
        });
        self.tasks.insert(id.to_string(), handle);
        debug!(reminder_id = %id, %due, "timer armed");
    }

    /// Cancel the armed task for `id`, if any.
    pub fn cancel(&mut self, id: &str) {
        if let Some(handle) = self.tasks.remove(id) {
            handle.abort();
        }
    }

    /// Cancel every armed task.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Number of ids with an armed task (fired-but-not-rearmed handles
    /// included until their id is re-armed or cancelled).
    pub fn armed(&self) -> usize {
        self.tasks.len()
    }
}
