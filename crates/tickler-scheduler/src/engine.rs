//! The scheduler engine: store mutation plus timer maintenance.

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use tickler_core::{HistoryEntry, RecurrenceRule, Reminder};

use crate::error::Result;
use crate::store::ReminderStore;
use crate::timers::TimerTable;

/// Capacity of the internal due-id channel between timer tasks and the
/// engine loop.
const DUE_CHANNEL_BUFFER: usize = 64;

/// Single owner of the reminder store and the timer table.
///
/// Every lifecycle event (create, edit, complete, fire) recomputes the
/// record's next due instant and re-arms its timer; removal cancels it.
/// Fired reminders are forwarded to `fired_tx` with `try_send` so a slow
/// delivery consumer can never stall the loop.
pub struct SchedulerEngine {
    store: ReminderStore,
    timers: TimerTable,
    due_rx: mpsc::Receiver<String>,
    fired_tx: Option<mpsc::Sender<Reminder>>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl SchedulerEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// Pass `Some(tx)` to receive every fired [`Reminder`] via mpsc.
    pub fn new(conn: Connection, fired_tx: Option<mpsc::Sender<Reminder>>) -> Result<Self> {
        let store = ReminderStore::new(conn)?;
        let (due_tx, due_rx) = mpsc::channel(DUE_CHANNEL_BUFFER);
        Ok(Self {
            store,
            timers: TimerTable::new(due_tx),
            due_rx,
            fired_tx,
        })
    }

    /// Create a reminder and arm its first delivery.
    pub fn create(&mut self, title: &str, icon: &str, rule: RecurrenceRule) -> Result<Reminder> {
        let now = local_now();
        let reminder = Reminder::new(title, icon, rule, now);
        self.store.insert(&reminder)?;
        self.timers.arm(&reminder.id, reminder.next_due, now);
        Ok(reminder)
    }

    /// Edit a reminder; the timer is re-armed for the recomputed due time
    /// (arming cancels the previously scheduled delivery first).
    pub fn update(
        &mut self,
        id: &str,
        title: Option<String>,
        icon: Option<String>,
        rule: Option<RecurrenceRule>,
    ) -> Result<Reminder> {
        let now = local_now();
        let reminder = self.store.update(id, title, icon, rule, now)?;
        self.timers.arm(&reminder.id, reminder.next_due, now);
        Ok(reminder)
    }

    /// Delete a reminder and cancel its armed delivery.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        self.timers.cancel(id);
        self.store.remove(id)
    }

    /// Mark a reminder done and arm the following occurrence.
    pub fn toggle_complete(&mut self, id: &str) -> Result<Reminder> {
        let now = local_now();
        let reminder = self.store.toggle_complete(id, now)?;
        self.timers.arm(&reminder.id, reminder.next_due, now);
        Ok(reminder)
    }

    pub fn get(&self, id: &str) -> Result<Reminder> {
        self.store.get(id)
    }

    pub fn list(&self) -> Result<Vec<Reminder>> {
        self.store.list()
    }

    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.store.history(limit)
    }

    /// Number of reminders with an armed timer.
    pub fn armed(&self) -> usize {
        self.timers.armed()
    }

    /// Arm every non-completed reminder; called once on startup.
    pub fn arm_all(&mut self) -> Result<usize> {
        let now = local_now();
        let mut armed = 0;
        for reminder in self.store.list()? {
            if !reminder.completed {
                self.timers.arm(&reminder.id, reminder.next_due, now);
                armed += 1;
            }
        }
        info!(count = armed, "reminders armed on startup");
        Ok(armed)
    }

    /// Main loop: waits for due ids from the timer tasks until `shutdown`
    /// broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        loop {
            tokio::select! {
                Some(id) = self.due_rx.recv() => {
                    if let Err(e) = self.fire(&id) {
                        error!(reminder_id = %id, "firing failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        self.timers.cancel_all();
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// A timer elapsed: advance `next_due`, re-arm, forward for delivery.
    fn fire(&mut self, id: &str) -> Result<()> {
        let now = local_now();
        let reminder = self.store.mark_fired(id, now)?;
        self.timers.arm(id, reminder.next_due, now);
        info!(
            reminder_id = %id,
            title = %reminder.title,
            next_due = %reminder.next_due,
            "reminder due"
        );

        if let Some(ref tx) = self.fired_tx {
            // try_send never blocks the loop; a full channel drops the
            // delivery, not the reschedule.
            if tx.try_send(reminder).is_err() {
                warn!(reminder_id = %id, "delivery channel full or closed; notification dropped");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickler_core::{ClockTime, Frequency, WeekdaySet};

    fn daily_rule() -> RecurrenceRule {
        RecurrenceRule {
            frequency: Frequency::Daily,
            time_of_day: ClockTime { hour: 9, minute: 0 },
            weekdays: WeekdaySet::EVERY_DAY,
            office_hours: None,
        }
    }

    fn engine() -> SchedulerEngine {
        SchedulerEngine::new(Connection::open_in_memory().unwrap(), None).unwrap()
    }

    #[tokio::test]
    async fn create_arms_a_timer() {
        let mut engine = engine();
        let reminder = engine.create("Stretch", "🧘", daily_rule()).unwrap();
        assert_eq!(engine.armed(), 1);
        assert!(engine.get(&reminder.id).is_ok());
    }

    #[tokio::test]
    async fn remove_cancels_the_timer() {
        let mut engine = engine();
        let reminder = engine.create("Stretch", "🧘", daily_rule()).unwrap();
        engine.remove(&reminder.id).unwrap();
        assert_eq!(engine.armed(), 0);
        assert!(engine.get(&reminder.id).is_err());
    }

    #[tokio::test]
    async fn update_keeps_a_single_timer() {
        let mut engine = engine();
        let reminder = engine.create("Stretch", "🧘", daily_rule()).unwrap();
        engine
            .update(&reminder.id, Some("Stretch more".into()), None, None)
            .unwrap();
        assert_eq!(engine.armed(), 1);
        assert_eq!(engine.get(&reminder.id).unwrap().title, "Stretch more");
    }

    #[tokio::test]
    async fn arm_all_counts_stored_reminders() {
        let mut engine = engine();
        engine.create("One", "1", daily_rule()).unwrap();
        engine.create("Two", "2", daily_rule()).unwrap();
        assert_eq!(engine.arm_all().unwrap(), 2);
        assert_eq!(engine.armed(), 2);
    }

    #[tokio::test]
    async fn toggle_complete_advances_and_rearms() {
        let mut engine = engine();
        let reminder = engine.create("Stretch", "🧘", daily_rule()).unwrap();
        let done = engine.toggle_complete(&reminder.id).unwrap();
        assert_eq!(done.completed_count, 1);
        assert!(done.next_due >= reminder.next_due);
        assert_eq!(engine.armed(), 1);
        assert_eq!(engine.history(10).unwrap().len(), 1);
    }
}
