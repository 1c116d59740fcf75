use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `reminders` and `history` tables (idempotent) and an index on
/// `next_due` so a due-ordered listing stays efficient with many reminders.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id              TEXT    NOT NULL PRIMARY KEY,
            title           TEXT    NOT NULL,
            icon            TEXT    NOT NULL,
            rule            TEXT    NOT NULL,   -- JSON-encoded RecurrenceRule
            completed       INTEGER NOT NULL DEFAULT 0,
            completed_count INTEGER NOT NULL DEFAULT 0,
            last_completed  TEXT,               -- ISO-8601 or NULL
            next_due        TEXT    NOT NULL,   -- ISO-8601
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_reminders_next_due ON reminders (next_due);

        CREATE TABLE IF NOT EXISTS history (
            id           TEXT NOT NULL PRIMARY KEY,
            reminder_id  TEXT NOT NULL,
            title        TEXT NOT NULL,
            icon         TEXT NOT NULL,
            completed_at TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_history_completed_at ON history (completed_at);
        ",
    )?;
    Ok(())
}
