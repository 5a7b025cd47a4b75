//! Reminder planning
//!
//! Pure functions turning an already-shuffled affirmation pool, a
//! frequency and a list of times into the batch of reminder jobs.
//! No I/O and no randomness happen here.

use crate::config::{
    CUSTOM_TITLE, DAILY_IDENTIFIER_PREFIX, DAILY_TITLE, WEEKDAY_IDENTIFIER_PREFIX,
    WEEKLY_IDENTIFIER_PREFIX, WEEKLY_TITLE,
};
use crate::database::{Affirmation, Frequency, TimeOfDay};
use crate::dispatch::{ReminderJob, Trigger};
use chrono::{NaiveDateTime, Weekday};
use uuid::Uuid;

/// Monday through Friday
const WORKWEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

pub fn daily_identifier(time_index: usize) -> String {
    format!("{}{}", DAILY_IDENTIFIER_PREFIX, time_index)
}

/// `weekday_ordinal` counts from 1 = Sunday
pub fn weekday_identifier(weekday_ordinal: u32, time_index: usize) -> String {
    format!("{}{}-{}", WEEKDAY_IDENTIFIER_PREFIX, weekday_ordinal, time_index)
}

pub fn weekly_identifier(time_index: usize) -> String {
    format!("{}{}", WEEKLY_IDENTIFIER_PREFIX, time_index)
}

/// Plan the recurring batch.
///
/// Daily slots take `shuffled[min(i, count - 1)]`, so extra times repeat the
/// last affirmation. Weekday slots take `shuffled[(ordinal - 2) % count]`.
/// Weekly slots always take `shuffled[0]` on Sunday.
pub fn plan_batch(
    shuffled: &[Affirmation],
    frequency: Frequency,
    times: &[TimeOfDay],
) -> Vec<ReminderJob> {
    let count = shuffled.len();
    if count == 0 {
        return Vec::new();
    }

    let mut jobs = Vec::new();

    for (i, time) in times.iter().copied().enumerate() {
        match frequency {
            Frequency::Daily => {
                let affirmation = &shuffled[i.min(count - 1)];
                jobs.push(ReminderJob {
                    identifier: daily_identifier(i),
                    title: DAILY_TITLE.to_string(),
                    body: affirmation.content.clone(),
                    trigger: Trigger::Daily { time },
                    time_index: Some(i),
                });
            }
            Frequency::Weekdays => {
                for weekday in WORKWEEK {
                    let ordinal = weekday.number_from_sunday();
                    let affirmation = &shuffled[(ordinal as usize - 2) % count];
                    jobs.push(ReminderJob {
                        identifier: weekday_identifier(ordinal, i),
                        title: DAILY_TITLE.to_string(),
                        body: affirmation.content.clone(),
                        trigger: Trigger::Weekly { weekday, time },
                        time_index: Some(i),
                    });
                }
            }
            Frequency::Weekly => {
                jobs.push(ReminderJob {
                    identifier: weekly_identifier(i),
                    title: WEEKLY_TITLE.to_string(),
                    body: shuffled[0].content.clone(),
                    trigger: Trigger::Weekly {
                        weekday: Weekday::Sun,
                        time,
                    },
                    time_index: Some(i),
                });
            }
            Frequency::Unknown => {
                tracing::debug!("Skipping {} for unknown frequency", time);
            }
        }
    }

    jobs
}

/// Plan a single ad-hoc reminder with a fresh random identifier.
///
/// A repeating custom reminder recurs daily at the time-of-day of `at`.
pub fn plan_custom(content: &str, at: NaiveDateTime, repeats: bool) -> ReminderJob {
    let trigger = if repeats {
        Trigger::Daily {
            time: TimeOfDay::from(at.time()),
        }
    } else {
        Trigger::Once { at }
    };

    ReminderJob {
        identifier: Uuid::new_v4().to_string(),
        title: CUSTOM_TITLE.to_string(),
        body: content.to_string(),
        trigger,
        time_index: None,
    }
}
