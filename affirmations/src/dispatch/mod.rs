//! Reminder dispatch facility
//!
//! The host-side registry of pending local reminders. The scheduler
//! computes [`ReminderJob`]s and hands them to a [`ReminderDispatcher`];
//! the dispatcher owns delivery.

pub mod cron;
pub mod memory;

pub use cron::{CronDispatcher, Delivery};
pub use memory::InMemoryDispatcher;

use crate::config::{DAILY_IDENTIFIER_PREFIX, WEEKDAY_IDENTIFIER_PREFIX, WEEKLY_IDENTIFIER_PREFIX};
use crate::database::TimeOfDay;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar rule deciding when a reminder fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Every day at the given time
    Daily { time: TimeOfDay },
    /// Every week on `weekday` at the given time
    Weekly { weekday: Weekday, time: TimeOfDay },
    /// Once, at an exact local date-time
    Once { at: NaiveDateTime },
}

impl Trigger {
    pub fn repeats(&self) -> bool {
        !matches!(self, Trigger::Once { .. })
    }

    /// Weekday ordinal in a week starting at 1 = Sunday
    pub fn weekday_ordinal(&self) -> Option<u32> {
        match self {
            Trigger::Weekly { weekday, .. } => Some(weekday.number_from_sunday()),
            _ => None,
        }
    }
}

/// One local notification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub trigger: Trigger,
    /// Position of the configured time this job was planned for.
    /// `None` for ad-hoc reminders.
    pub time_index: Option<usize>,
}

/// Whether an identifier belongs to the recurring batch
pub fn is_batch_identifier(identifier: &str) -> bool {
    identifier.starts_with(DAILY_IDENTIFIER_PREFIX)
        || identifier.starts_with(WEEKLY_IDENTIFIER_PREFIX)
        || identifier.starts_with(WEEKDAY_IDENTIFIER_PREFIX)
}

/// Host facility that registers and delivers local reminders.
///
/// Adding a job whose identifier is already pending replaces it.
#[async_trait]
pub trait ReminderDispatcher: Send + Sync {
    /// Ask the host for permission to deliver. Denial is not an error.
    async fn request_authorization(&self) -> Result<bool>;

    async fn add(&self, job: ReminderJob) -> Result<()>;

    /// Identifiers of every pending reminder
    async fn pending_identifiers(&self) -> Result<Vec<String>>;

    async fn remove(&self, identifiers: &[String]) -> Result<()>;

    async fn remove_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_batch_identifiers() {
        assert!(is_batch_identifier("daily-affirmation-0"));
        assert!(is_batch_identifier("weekly-affirmation-3"));
        assert!(is_batch_identifier("affirmation-2-1"));
        assert!(!is_batch_identifier(&Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_trigger_weekday_ordinal() {
        let time = TimeOfDay::default_time();
        let sunday = Trigger::Weekly {
            weekday: Weekday::Sun,
            time,
        };
        let friday = Trigger::Weekly {
            weekday: Weekday::Fri,
            time,
        };
        assert_eq!(sunday.weekday_ordinal(), Some(1));
        assert_eq!(friday.weekday_ordinal(), Some(6));
        assert_eq!(Trigger::Daily { time }.weekday_ordinal(), None);
        assert!(Trigger::Daily { time }.repeats());
    }
}
