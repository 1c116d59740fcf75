//! Recurrence-rule types.
//!
//! The serialised form is wire-compatible with the legacy record format:
//! clock times as `"HH:MM"` strings, the weekday mask as an integer list
//! (`0` = Sunday .. `6` = Saturday), and the three-day cadence spelled
//! `"every3days"`.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RuleError;

/// How often a reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every whole hour, gated by the office window when one is set.
    Hourly,
    Daily,
    #[serde(rename = "every3days")]
    EveryThreeDays,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::EveryThreeDays => "every3days",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "every3days" => Ok(Frequency::EveryThreeDays),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(RuleError::UnknownFrequency(other.to_string())),
        }
    }
}

/// A wall-clock hour and minute, parsed from and rendered as `"HH:MM"`.
///
/// Invariant: `hour < 24`, `minute < 60`. Parsing enforces it; direct
/// construction is expected to keep it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    /// The same instant as a chrono `NaiveTime` (seconds are always zero).
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleError::InvalidClockTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        if hour >= 24 || minute >= 60 {
            return Err(invalid());
        }
        Ok(ClockTime { hour, minute })
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The set of weekdays an occurrence may land on.
///
/// Day indices follow the legacy record format: 0 = Sunday .. 6 = Saturday.
/// The set may be empty; the engine still terminates on an empty mask, it
/// just cannot produce a conforming day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    /// All seven days.
    pub const EVERY_DAY: WeekdaySet = WeekdaySet(0b0111_1111);
    /// Monday through Friday.
    pub const WEEKDAYS: WeekdaySet = WeekdaySet(0b0011_1110);
    /// Saturday and Sunday.
    pub const WEEKEND: WeekdaySet = WeekdaySet(0b0100_0001);

    /// Build a set from day indices (0 = Sunday .. 6 = Saturday).
    pub fn from_days(days: &[u8]) -> Result<Self, RuleError> {
        let mut mask = 0u8;
        for &day in days {
            if day > 6 {
                return Err(RuleError::InvalidWeekday(day));
            }
            mask |= 1 << day;
        }
        Ok(WeekdaySet(mask))
    }

    /// The single weekday-membership predicate shared by every frequency
    /// branch that filters on weekdays.
    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_sunday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Day indices in ascending order, for display and serialisation.
    pub fn days(self) -> Vec<u8> {
        (0u8..7).filter(|d| self.0 & (1 << d) != 0).collect()
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.days().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<u8>::deserialize(deserializer)?;
        WeekdaySet::from_days(&days).map_err(serde::de::Error::custom)
    }
}

/// A daily `[start, end)` window restricting hourly reminders to
/// business-hour firing.
///
/// The scan is hour-granular: minutes are accepted on input but only the
/// hour components gate candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

/// Immutable input to the next-occurrence engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Wall-clock time of day; meaningful for every frequency except Hourly.
    #[serde(rename = "time")]
    pub time_of_day: ClockTime,
    #[serde(rename = "days")]
    pub weekdays: WeekdaySet,
    /// Only meaningful when `frequency` is Hourly.
    #[serde(
        rename = "officeHours",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub office_hours: Option<OfficeWindow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_parses_and_displays() {
        let t: ClockTime = "08:05".parse().unwrap();
        assert_eq!(t, ClockTime { hour: 8, minute: 5 });
        assert_eq!(t.to_string(), "08:05");
    }

    #[test]
    fn clock_time_rejects_garbage() {
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("09:60".parse::<ClockTime>().is_err());
        assert!("0900".parse::<ClockTime>().is_err());
        assert!("nine".parse::<ClockTime>().is_err());
    }

    #[test]
    fn weekday_set_membership() {
        let set = WeekdaySet::from_days(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(set, WeekdaySet::WEEKDAYS);
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Fri));
        assert!(!set.contains(Weekday::Sat));
        assert!(!set.contains(Weekday::Sun));
    }

    #[test]
    fn weekday_set_rejects_out_of_range_day() {
        assert!(WeekdaySet::from_days(&[7]).is_err());
    }

    #[test]
    fn empty_weekday_set_contains_nothing() {
        assert!(WeekdaySet::EMPTY.is_empty());
        assert!(!WeekdaySet::EMPTY.contains(Weekday::Mon));
    }

    #[test]
    fn rule_serialises_in_wire_format() {
        let rule = RecurrenceRule {
            frequency: Frequency::EveryThreeDays,
            time_of_day: "20:00".parse().unwrap(),
            weekdays: WeekdaySet::EVERY_DAY,
            office_hours: None,
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            json,
            r#"{"frequency":"every3days","time":"20:00","days":[0,1,2,3,4,5,6]}"#
        );
        let back: RecurrenceRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn rule_with_office_window_round_trips() {
        let rule = RecurrenceRule {
            frequency: Frequency::Hourly,
            time_of_day: "08:00".parse().unwrap(),
            weekdays: WeekdaySet::WEEKDAYS,
            office_hours: Some(OfficeWindow {
                start: "08:00".parse().unwrap(),
                end: "17:00".parse().unwrap(),
            }),
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains(r#""officeHours":{"start":"08:00","end":"17:00"}"#));
        let back: RecurrenceRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
