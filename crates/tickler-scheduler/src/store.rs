//! SQLite-backed reminder store.
//!
//! All mutating calls take the current instant as a parameter instead of
//! reading a clock, so every recompute stays deterministic under test.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use tickler_core::{next_occurrence, HistoryEntry, RecurrenceRule, Reminder};

use crate::db::init_db;
use crate::error::{Result, SchedulerError};

/// Maximum number of completion events retained; older rows are pruned on
/// insert.
pub const HISTORY_CAP: usize = 100;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn ts(t: NaiveDateTime) -> String {
    t.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).ok()
}

// Column order shared by every reminder SELECT:
// id, title, icon, rule, completed, completed_count, last_completed,
// next_due, created_at
type ReminderRow = (
    String,
    String,
    String,
    String,
    bool,
    u32,
    Option<String>,
    String,
    String,
);

const REMINDER_COLUMNS: &str = "id, title, icon, rule, completed, completed_count, \
     last_completed, next_due, created_at";

/// CRUD over the `reminders` and `history` tables.
pub struct ReminderStore {
    conn: Connection,
}

impl ReminderStore {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Persist a freshly built reminder.
    pub fn insert(&self, reminder: &Reminder) -> Result<()> {
        let rule_json = encode_rule(&reminder.rule)?;
        self.conn.execute(
            "INSERT INTO reminders
             (id, title, icon, rule, completed, completed_count, last_completed,
              next_due, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?9)",
            rusqlite::params![
                reminder.id,
                reminder.title,
                reminder.icon,
                rule_json,
                reminder.completed,
                reminder.completed_count,
                reminder.last_completed.map(ts),
                ts(reminder.next_due),
                ts(reminder.created_at),
            ],
        )?;
        info!(reminder_id = %reminder.id, title = %reminder.title, "reminder added");
        Ok(())
    }

    /// Fetch one reminder; `ReminderNotFound` when the id is unknown.
    pub fn get(&self, id: &str) -> Result<Reminder> {
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1");
        let row: Option<ReminderRow> = self
            .conn
            .query_row(&sql, [id], row_tuple)
            .optional()?;
        let row = row.ok_or_else(|| SchedulerError::ReminderNotFound { id: id.to_string() })?;
        decode(row).ok_or_else(|| SchedulerError::InvalidRule(format!("undecodable row for {id}")))
    }

    /// All reminders ordered by creation time. Undecodable rows are skipped.
    pub fn list(&self) -> Result<Vec<Reminder>> {
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY created_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let reminders = stmt
            .query_map([], row_tuple)?
            .filter_map(|r| r.ok())
            .filter_map(decode)
            .collect();
        Ok(reminders)
    }

    /// Apply an edit: any of title, icon or rule may change, and `next_due`
    /// is recomputed from `now` either way. Returns the updated record.
    pub fn update(
        &self,
        id: &str,
        title: Option<String>,
        icon: Option<String>,
        rule: Option<RecurrenceRule>,
        now: NaiveDateTime,
    ) -> Result<Reminder> {
        let mut reminder = self.get(id)?;
        if let Some(title) = title {
            reminder.title = title;
        }
        if let Some(icon) = icon {
            reminder.icon = icon;
        }
        if let Some(rule) = rule {
            reminder.rule = rule;
        }
        reminder.next_due = next_occurrence(&reminder.rule, now);
        self.persist(&reminder, now)?;
        info!(reminder_id = %id, next_due = %reminder.next_due, "reminder updated");
        Ok(reminder)
    }

    /// Remove a reminder by ID. Completion history is kept.
    pub fn remove(&self, id: &str) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::ReminderNotFound { id: id.to_string() });
        }
        info!(reminder_id = %id, "reminder removed");
        Ok(())
    }

    /// Completion toggle: completing bumps the
    /// counter, records a history row, advances `next_due` past `now` and
    /// immediately unmarks so the next occurrence is live. Toggling an
    /// already-completed record just unmarks it.
    pub fn toggle_complete(&self, id: &str, now: NaiveDateTime) -> Result<Reminder> {
        let mut reminder = self.get(id)?;
        if !reminder.completed {
            reminder.completed_count += 1;
            reminder.last_completed = Some(now);
            self.push_history(&reminder, now)?;
            reminder.next_due = next_occurrence(&reminder.rule, now);
            info!(
                reminder_id = %id,
                count = reminder.completed_count,
                next_due = %reminder.next_due,
                "reminder completed"
            );
        }
        reminder.completed = false;
        self.persist(&reminder, now)?;
        Ok(reminder)
    }

    /// Advance `next_due` after a delivery fired. Returns the updated record.
    pub fn mark_fired(&self, id: &str, now: NaiveDateTime) -> Result<Reminder> {
        let mut reminder = self.get(id)?;
        reminder.next_due = next_occurrence(&reminder.rule, now);
        self.persist(&reminder, now)?;
        Ok(reminder)
    }

    /// Most recent completion events, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reminder_id, title, icon, completed_at
             FROM history ORDER BY completed_at DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, reminder_id, title, icon, completed_at)| {
                Some(HistoryEntry {
                    id,
                    reminder_id,
                    title,
                    icon,
                    completed_at: parse_ts(&completed_at)?,
                })
            })
            .collect();
        Ok(entries)
    }

    // --- private helpers ---------------------------------------------------

    fn persist(&self, reminder: &Reminder, now: NaiveDateTime) -> Result<()> {
        let rule_json = encode_rule(&reminder.rule)?;
        self.conn.execute(
            "UPDATE reminders SET title=?2, icon=?3, rule=?4, completed=?5,
              completed_count=?6, last_completed=?7, next_due=?8, updated_at=?9
             WHERE id=?1",
            rusqlite::params![
                reminder.id,
                reminder.title,
                reminder.icon,
                rule_json,
                reminder.completed,
                reminder.completed_count,
                reminder.last_completed.map(ts),
                ts(reminder.next_due),
                ts(now),
            ],
        )?;
        Ok(())
    }

    fn push_history(&self, reminder: &Reminder, completed_at: NaiveDateTime) -> Result<()> {
        self.conn.execute(
            "INSERT INTO history (id, reminder_id, title, icon, completed_at)
             VALUES (?1,?2,?3,?4,?5)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                reminder.id,
                reminder.title,
                reminder.icon,
                ts(completed_at),
            ],
        )?;
        // Keep only the newest HISTORY_CAP rows.
        self.conn.execute(
            "DELETE FROM history WHERE id NOT IN
             (SELECT id FROM history ORDER BY completed_at DESC LIMIT ?1)",
            [HISTORY_CAP],
        )?;
        Ok(())
    }
}

fn encode_rule(rule: &RecurrenceRule) -> Result<String> {
    serde_json::to_string(rule).map_err(|e| SchedulerError::InvalidRule(e.to_string()))
}

fn row_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReminderRow> {
    Ok((
        row.get(0)?, // id
        row.get(1)?, // title
        row.get(2)?, // icon
        row.get(3)?, // rule JSON
        row.get(4)?, // completed
        row.get(5)?, // completed_count
        row.get(6)?, // last_completed
        row.get(7)?, // next_due
        row.get(8)?, // created_at
    ))
}

fn decode(row: ReminderRow) -> Option<Reminder> {
    let (id, title, icon, rule_json, completed, completed_count, last_completed, next_due, created_at) =
        row;
    Some(Reminder {
        id,
        title,
        icon,
        rule: serde_json::from_str(&rule_json).ok()?,
        completed,
        completed_count,
        last_completed: match last_completed {
            Some(s) => Some(parse_ts(&s)?),
            None => None,
        },
        next_due: parse_ts(&next_due)?,
        created_at: parse_ts(&created_at)?,
    })
}
