//! The reminder record owned by the orchestration layer.
//!
//! The engine in [`crate::occurrence`] never mutates a [`Reminder`]; the
//! scheduler recomputes `next_due` on creation, edit, completion and fire.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::occurrence::next_occurrence;
use crate::rule::{ClockTime, Frequency, OfficeWindow, RecurrenceRule, WeekdaySet};

/// A persisted reminder: identity, display fields, the recurrence rule and
/// the cached next-due instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// UUID v4 string, primary key.
    pub id: String,
    pub title: String,
    /// Short display glyph, e.g. an emoji.
    pub icon: String,
    pub rule: RecurrenceRule,
    /// Completion flag; toggling it off immediately re-arms the next
    /// occurrence, so it is transient in practice.
    pub completed: bool,
    /// Total number of completions recorded.
    pub completed_count: u32,
    pub last_completed: Option<NaiveDateTime>,
    /// Cached output of the engine; always strictly after the `now` it was
    /// computed from.
    pub next_due: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl Reminder {
    /// Build a fresh record with `next_due` computed from `now`.
    pub fn new(title: &str, icon: &str, rule: RecurrenceRule, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
            next_due: next_occurrence(&rule, now),
            rule,
            completed: false,
            completed_count: 0,
            last_completed: None,
            created_at: now,
        }
    }
}

/// One completion event, kept for the history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub reminder_id: String,
    pub title: String,
    pub icon: String,
    pub completed_at: NaiveDateTime,
}

/// A starter rule offered by the CLI (`add --template <name>`).
#[derive(Debug, Clone)]
pub struct Template {
    pub name: &'static str,
    pub title: &'static str,
    pub icon: &'static str,
    pub rule: RecurrenceRule,
}

/// The built-in starter templates.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            name: "haircut",
            title: "Haircut",
            icon: "✂️",
            rule: RecurrenceRule {
                frequency: Frequency::Monthly,
                time_of_day: ClockTime { hour: 9, minute: 0 },
                weekdays: WeekdaySet::EVERY_DAY,
                office_hours: None,
            },
        },
        Template {
            name: "wash",
            title: "Wash",
            icon: "🚿",
            rule: RecurrenceRule {
                frequency: Frequency::EveryThreeDays,
                time_of_day: ClockTime {
                    hour: 20,
                    minute: 0,
                },
                weekdays: WeekdaySet::EVERY_DAY,
                office_hours: None,
            },
        },
        Template {
            name: "water",
            title: "Drink Water",
            icon: "💧",
            rule: RecurrenceRule {
                frequency: Frequency::Hourly,
                time_of_day: ClockTime { hour: 8, minute: 0 },
                weekdays: WeekdaySet::WEEKDAYS,
                office_hours: Some(OfficeWindow {
                    start: ClockTime { hour: 8, minute: 0 },
                    end: ClockTime {
                        hour: 17,
                        minute: 0,
                    },
                }),
            },
        },
    ]
}
