//! `tickler-scheduler` — orchestration around the pure recurrence engine.
//!
//! # Overview
//!
//! Reminder records are persisted to a SQLite `reminders` table; completion
//! events land in a capped `history` table. The [`engine::SchedulerEngine`]
//! owns a [`timers::TimerTable`], an explicit map from reminder id to its
//! armed delivery task. Arming an id cancels any previous task for that id,
//! so an edited or completed reminder can never fire twice.
//!
//! When a timer elapses the engine recomputes and persists the next due
//! instant, re-arms the timer, and forwards the fired [`Reminder`] over an
//! mpsc channel to whatever delivery front end the caller wired up.
//!
//! [`Reminder`]: tickler_core::Reminder

pub mod db;
pub mod engine;
pub mod error;
pub mod store;
pub mod timers;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use store::{ReminderStore, HISTORY_CAP};
pub use timers::TimerTable;
