//! `tickler-core` — pure reminder domain: recurrence rules and the
//! next-occurrence engine.
//!
//! # Overview
//!
//! The heart of the crate is [`occurrence::next_occurrence`], a pure function
//! of a [`rule::RecurrenceRule`] and a caller-supplied wall-clock instant.
//! It never reads a system clock, never fails, always terminates, and always
//! returns an instant strictly after the one it was given. Persistence and
//! timer plumbing live in `tickler-scheduler`.
//!
//! # Frequency variants
//!
//! | Variant          | Behaviour                                              |
//! |------------------|--------------------------------------------------------|
//! | `Hourly`         | Every whole hour, optionally gated by an office window |
//! | `Daily`          | At HH:MM every allowed weekday                         |
//! | `EveryThreeDays` | At HH:MM, three days apart, nudged to an allowed day   |
//! | `Weekly`         | At HH:MM, seven days apart, nudged to an allowed day   |
//! | `Monthly`        | At HH:MM, one month apart, nudged to an allowed day    |

pub mod config;
pub mod error;
pub mod occurrence;
pub mod reminder;
pub mod rule;

pub use config::TicklerConfig;
pub use error::{Result, RuleError};
pub use occurrence::next_occurrence;
pub use reminder::{builtin_templates, HistoryEntry, Reminder, Template};
pub use rule::{ClockTime, Frequency, OfficeWindow, RecurrenceRule, WeekdaySet};
