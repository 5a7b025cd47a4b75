//! Preferences service
//!
//! Owns the notification preference singleton: creates it with
//! defaults on first load and normalizes every update before it
//! reaches the record store.

use crate::config::MAX_DAILY_NOTIFICATIONS;
use crate::database::{Frequency, NotificationPreference, Repository, TimeOfDay};
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

/// Default preference: enabled, daily, 08:00
pub fn default_preference() -> NotificationPreference {
    NotificationPreference {
        id: Uuid::new_v4().to_string(),
        enabled: true,
        frequency: Frequency::Daily,
        times: vec![TimeOfDay::default_time()],
        legacy_time: Some(TimeOfDay::default_time()),
        updated_at: Utc::now(),
    }
}

/// Sort, deduplicate and cap `times`.
///
/// An enabled preference with no times falls back to the legacy time,
/// or 08:00 when there is none.
pub fn normalize_times(
    mut times: Vec<TimeOfDay>,
    enabled: bool,
    legacy_time: Option<TimeOfDay>,
) -> Vec<TimeOfDay> {
    times.sort();
    times.dedup();

    if times.len() > MAX_DAILY_NOTIFICATIONS {
        tracing::warn!(
            "Dropping {} notification time(s) beyond the limit of {}",
            times.len() - MAX_DAILY_NOTIFICATIONS,
            MAX_DAILY_NOTIFICATIONS
        );
        times.truncate(MAX_DAILY_NOTIFICATIONS);
    }

    if enabled && times.is_empty() {
        times.push(legacy_time.unwrap_or(TimeOfDay::default_time()));
    }

    times
}

/// Service for the notification preference
#[derive(Clone)]
pub struct PreferencesService {
    repo: Repository,
}

impl PreferencesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Load the preference, creating the default one if absent
    pub async fn load(&self) -> Result<NotificationPreference> {
        let mut preference = match self.repo.get_preference().await? {
            Some(preference) => preference,
            None => {
                tracing::info!("Notification preference not found, creating default");
                let preference = default_preference();
                self.repo.insert_preference(&preference).await?;
                preference
            }
        };

        preference.times = preference.effective_times();
        Ok(preference)
    }

    /// Validate and persist a new configuration
    pub async fn update(
        &self,
        enabled: bool,
        frequency: Frequency,
        times: Vec<TimeOfDay>,
    ) -> Result<NotificationPreference> {
        if frequency == Frequency::Unknown {
            return Err(AppError::InvalidPreference(
                "Frequency must be daily, weekdays or weekly".to_string(),
            ));
        }

        let mut preference = self.load().await?;
        preference.times = normalize_times(times, enabled, preference.legacy_time);
        // Legacy single time follows the earliest saved time
        if let Some(first) = preference.times.first() {
            preference.legacy_time = Some(*first);
        }
        preference.enabled = enabled;
        preference.frequency = frequency;
        preference.updated_at = Utc::now();

        self.repo.replace_preference(&preference).await?;

        tracing::info!(
            "Notification preference saved: enabled={}, frequency={}, times={:?}",
            preference.enabled,
            preference.frequency,
            preference.times.iter().map(|t| t.to_string()).collect::<Vec<_>>()
        );

        Ok(preference)
    }
}
