//! Database models
//!
//! Rust structs representing stored entities and the value types
//! they are built from. All models use serde for serialization to
//! the presentation layer.

use crate::config::{DEFAULT_NOTIFICATION_HOUR, DEFAULT_NOTIFICATION_MINUTE};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// A short user-authored positive statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Affirmation {
    pub id: String,
    pub content: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

/// Hour and minute without a date, used as a recurring trigger anchor.
///
/// Ordering is chronological. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::InvalidTime(format!("{}:{}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    /// 08:00, used whenever notifications are enabled without any time
    pub const fn default_time() -> Self {
        Self {
            hour: DEFAULT_NOTIFICATION_HOUR,
            minute: DEFAULT_NOTIFICATION_MINUTE,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AppError::InvalidTime(s.to_string()))?;

        let hour: u8 = hour
            .parse()
            .map_err(|_| AppError::InvalidTime(s.to_string()))?;
        let minute: u8 = minute
            .parse()
            .map_err(|_| AppError::InvalidTime(s.to_string()))?;

        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// Delivery cadence for recurring reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekly,
    /// A stored value this version does not understand.
    /// Scheduling with it creates no reminders.
    #[serde(other)]
    Unknown,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekdays => "weekdays",
            Frequency::Weekly => "weekly",
            Frequency::Unknown => "unknown",
        }
    }

    /// Lenient decoding for values read back from the store
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("Unrecognized stored frequency: {}", value);
            Frequency::Unknown
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekdays" => Ok(Frequency::Weekdays),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(AppError::InvalidPreference(format!(
                "Unknown frequency '{}'. Use 'daily', 'weekdays' or 'weekly'",
                s
            ))),
        }
    }
}

/// Notification configuration, one per installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub id: String,
    pub enabled: bool,
    pub frequency: Frequency,
    /// Sorted ascending, deduplicated, at most five entries
    pub times: Vec<TimeOfDay>,
    /// Single time kept from before multiple times were supported
    pub legacy_time: Option<TimeOfDay>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Times to schedule at. An enabled preference never yields an empty list.
    pub fn effective_times(&self) -> Vec<TimeOfDay> {
        if self.enabled && self.times.is_empty() {
            return vec![self.legacy_time.unwrap_or(TimeOfDay::default_time())];
        }
        self.times.clone()
    }
}

/// Raw preference row
#[derive(Debug, Clone, FromRow)]
pub(crate) struct PreferenceRow {
    pub id: String,
    pub enabled: bool,
    pub frequency: String,
    pub legacy_hour: Option<i64>,
    pub legacy_minute: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Raw per-time sub-record row
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TimeRow {
    pub hour: i64,
    pub minute: i64,
}

impl TimeRow {
    pub fn to_time(&self) -> Result<TimeOfDay> {
        let hour = u8::try_from(self.hour)
            .map_err(|_| AppError::InvalidTime(format!("{}:{}", self.hour, self.minute)))?;
        let minute = u8::try_from(self.minute)
            .map_err(|_| AppError::InvalidTime(format!("{}:{}", self.hour, self.minute)))?;
        TimeOfDay::new(hour, minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse_and_display() {
        let time: TimeOfDay = "7:05".parse().unwrap();
        assert_eq!(time.hour(), 7);
        assert_eq!(time.minute(), 5);
        assert_eq!(time.to_string(), "07:05");
    }

    #[test]
    fn test_time_of_day_rejects_out_of_range() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_orders_chronologically() {
        let mut times = vec![
            TimeOfDay::new(21, 0).unwrap(),
            TimeOfDay::new(8, 30).unwrap(),
            TimeOfDay::new(8, 5).unwrap(),
        ];
        times.sort();
        let printed: Vec<String> = times.iter().map(|t| t.to_string()).collect();
        assert_eq!(printed, vec!["08:05", "08:30", "21:00"]);
    }

    #[test]
    fn test_time_of_day_serializes_as_string() {
        let time = TimeOfDay::new(9, 15).unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"09:15\"");

        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("Weekdays".parse::<Frequency>().unwrap(), Frequency::Weekdays);
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("monthly".parse::<Frequency>().is_err());
        assert_eq!(Frequency::from_stored("monthly"), Frequency::Unknown);
    }

    #[test]
    fn test_effective_times_falls_back() {
        let mut pref = NotificationPreference {
            id: "p".to_string(),
            enabled: true,
            frequency: Frequency::Daily,
            times: vec![],
            legacy_time: Some(TimeOfDay::new(6, 45).unwrap()),
            updated_at: Utc::now(),
        };
        assert_eq!(pref.effective_times(), vec![TimeOfDay::new(6, 45).unwrap()]);

        pref.legacy_time = None;
        assert_eq!(pref.effective_times(), vec![TimeOfDay::default_time()]);

        pref.enabled = false;
        assert!(pref.effective_times().is_empty());
    }
}
