use thiserror::Error;

/// Errors that can occur while constructing or parsing a recurrence rule.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A clock-time string did not parse as `HH:MM`.
    #[error("Invalid clock time: {0} (expected HH:MM)")]
    InvalidClockTime(String),

    /// A weekday index was outside 0..=6 (0 = Sunday, 6 = Saturday).
    #[error("Invalid weekday: {0} (expected 0=Sunday .. 6=Saturday)")]
    InvalidWeekday(u8),

    /// An unrecognised frequency token.
    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),
}

pub type Result<T> = std::result::Result<T, RuleError>;
