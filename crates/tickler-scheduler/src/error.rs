use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored rule column failed to round-trip through serde.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// No reminder with the given ID exists in the store.
    #[error("Reminder not found: {id}")]
    ReminderNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
