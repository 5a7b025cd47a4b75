//! Application state and initialization
//!
//! Builds every service from explicit collaborators and exposes the
//! flows the presentation layer triggers.

use crate::config::{DATABASE_FILE, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use crate::database::{create_pool, Frequency, NotificationPreference, Repository, TimeOfDay};
use crate::dispatch::ReminderDispatcher;
use crate::error::Result;
use crate::services::{AffirmationsService, NotificationService, PreferencesService, ScheduleOutcome};
use std::path::PathBuf;
use std::sync::Arc;

/// Data directory from the environment, or the default
pub fn resolve_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub affirmations: AffirmationsService,
    pub preferences: PreferencesService,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(repo: Repository, notifications: NotificationService) -> Self {
        Self {
            affirmations: AffirmationsService::new(repo.clone()),
            preferences: PreferencesService::new(repo),
            notifications,
        }
    }

    /// Open the store in `data_dir` and prepare first-run data.
    ///
    /// Failure here is fatal for the application.
    pub async fn initialize(
        data_dir: PathBuf,
        dispatcher: Arc<dyn ReminderDispatcher>,
    ) -> Result<Self> {
        tracing::info!("Initializing application in {:?}", data_dir);

        std::fs::create_dir_all(&data_dir)?;
        let pool = create_pool(&data_dir.join(DATABASE_FILE)).await?;

        let state = Self::new(Repository::new(pool), NotificationService::new(dispatcher));

        state.affirmations.seed_samples().await?;
        state.preferences.load().await?;
        state.notifications.request_authorization().await;

        tracing::info!("Application initialized successfully");
        Ok(state)
    }

    /// Persist notification settings, then rebuild the reminder batch.
    ///
    /// Disabling revokes the batch; custom reminders are kept.
    pub async fn save_notification_settings(
        &self,
        enabled: bool,
        frequency: Frequency,
        times: Vec<TimeOfDay>,
    ) -> Result<(NotificationPreference, ScheduleOutcome)> {
        let preference = self.preferences.update(enabled, frequency, times).await?;
        let outcome = self.apply(&preference).await?;
        Ok((preference, outcome))
    }

    /// Rebuild the reminder batch from the stored preference
    pub async fn reschedule(&self) -> Result<ScheduleOutcome> {
        let preference = self.preferences.load().await?;
        self.apply(&preference).await
    }

    async fn apply(&self, preference: &NotificationPreference) -> Result<ScheduleOutcome> {
        if !preference.enabled {
            tracing::info!("Notifications disabled, revoking scheduled reminders");
            self.notifications.revoke_batch().await?;
            return Ok(ScheduleOutcome::default());
        }

        let affirmations = self.affirmations.list().await?;
        self.notifications
            .schedule(&affirmations, preference.frequency, &preference.times)
            .await
    }
}
