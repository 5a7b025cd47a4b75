//! Notification service
//!
//! Turns the affirmation pool and notification preference into
//! registered reminders. Every `schedule` call revokes the previous
//! batch and registers a freshly shuffled one; registrations run as
//! independent tasks so the caller never waits on the host.

use super::planner;
use crate::config::DEFAULT_REMIND_DELAY_MINUTES;
use crate::database::{Affirmation, Frequency, TimeOfDay};
use crate::dispatch::{is_batch_identifier, ReminderDispatcher, ReminderJob};
use crate::error::{AppError, Result};
use chrono::{Duration, Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Handle to one in-flight registration.
///
/// Dropping it leaves the registration running in the background.
#[derive(Debug)]
pub struct Registration {
    identifier: String,
    handle: JoinHandle<Result<()>>,
}

impl Registration {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Wait for the host to accept or reject this reminder
    pub async fn completion(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| AppError::Dispatch(format!("Registration task failed: {}", e)))?
    }
}

/// Result of one `schedule` call
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    generation: u64,
    pub jobs: Vec<ReminderJob>,
    pub registrations: Vec<Registration>,
}

impl ScheduleOutcome {
    /// Monotonic counter; the highest generation is the live batch
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for every registration, in planning order
    pub async fn completions(self) -> Vec<(String, Result<()>)> {
        let mut results = Vec::with_capacity(self.registrations.len());
        for registration in self.registrations {
            let identifier = registration.identifier.clone();
            results.push((identifier, registration.completion().await));
        }
        results
    }
}

/// Service scheduling affirmation reminders through a dispatcher
#[derive(Clone)]
pub struct NotificationService {
    dispatcher: Arc<dyn ReminderDispatcher>,
    rng: Arc<Mutex<Box<dyn RngCore + Send>>>,
    /// Batch generation. Held for writing while a batch is revoked and
    /// for reading while one of its jobs is added.
    generation: Arc<RwLock<u64>>,
}

impl NotificationService {
    pub fn new(dispatcher: Arc<dyn ReminderDispatcher>) -> Self {
        Self::with_rng(dispatcher, StdRng::from_entropy())
    }

    /// Use a specific randomness source for shuffling
    pub fn with_rng(
        dispatcher: Arc<dyn ReminderDispatcher>,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        Self {
            dispatcher,
            rng: Arc::new(Mutex::new(Box::new(rng))),
            generation: Arc::new(RwLock::new(0)),
        }
    }

    /// Ask the host for permission to deliver reminders
    pub async fn request_authorization(&self) -> bool {
        match self.dispatcher.request_authorization().await {
            Ok(true) => {
                tracing::info!("Notification permission granted");
                true
            }
            Ok(false) => {
                tracing::info!("Notification permission denied");
                false
            }
            Err(e) => {
                tracing::error!("Error requesting notification permission: {}", e);
                false
            }
        }
    }

    /// Replace the recurring batch.
    ///
    /// Revocation completes before this returns; registrations of the new
    /// batch are spawned and reported through the returned handles. A newer
    /// call supersedes any registration of this one that has not landed yet.
    pub async fn schedule(
        &self,
        affirmations: &[Affirmation],
        frequency: Frequency,
        times: &[TimeOfDay],
    ) -> Result<ScheduleOutcome> {
        let generation = {
            let mut generation = self.generation.write().await;
            *generation += 1;
            self.revoke_batch_identifiers().await?;
            *generation
        };

        if affirmations.is_empty() {
            tracing::info!("No affirmations saved, nothing to schedule");
            return Ok(ScheduleOutcome {
                generation,
                ..ScheduleOutcome::default()
            });
        }

        let shuffled = {
            let mut rng = self.rng.lock().await;
            let mut pool = affirmations.to_vec();
            pool.shuffle(&mut *rng);
            pool
        };

        let jobs = planner::plan_batch(&shuffled, frequency, times);
        let registrations = jobs
            .iter()
            .cloned()
            .map(|job| self.register(job, Some(generation)))
            .collect();

        tracing::info!(
            "Scheduling {} {} reminder(s) across {} time(s)",
            jobs.len(),
            frequency,
            times.len()
        );

        Ok(ScheduleOutcome {
            generation,
            jobs,
            registrations,
        })
    }

    /// Revoke the recurring batch, leaving custom reminders in place
    pub async fn revoke_batch(&self) -> Result<()> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        self.revoke_batch_identifiers().await
    }

    /// Revoke every pending reminder, custom ones included
    pub async fn clear_all(&self) -> Result<()> {
        let mut generation = self.generation.write().await;
        *generation += 1;
        self.dispatcher.remove_all().await
    }

    /// Register a one-off reminder outside the recurring batch
    pub async fn schedule_custom(
        &self,
        content: &str,
        at: NaiveDateTime,
        repeats: bool,
    ) -> Registration {
        let job = planner::plan_custom(content, at, repeats);
        tracing::info!("Scheduling custom reminder {} at {}", job.identifier, at);
        self.register(job, None)
    }

    /// Register a one-off reminder `delay` from now
    pub async fn remind_in(&self, content: &str, delay: Duration) -> Registration {
        let at = (Local::now() + delay).naive_local();
        self.schedule_custom(content, at, false).await
    }

    /// "Remind me later" for a single affirmation
    pub async fn remind_later(&self, content: &str) -> Registration {
        self.remind_in(content, Duration::minutes(DEFAULT_REMIND_DELAY_MINUTES))
            .await
    }

    async fn revoke_batch_identifiers(&self) -> Result<()> {
        let batch: Vec<String> = self
            .dispatcher
            .pending_identifiers()
            .await?
            .into_iter()
            .filter(|identifier| is_batch_identifier(identifier))
            .collect();

        if !batch.is_empty() {
            tracing::debug!("Revoking {} scheduled reminder(s)", batch.len());
            self.dispatcher.remove(&batch).await?;
        }

        Ok(())
    }

    fn register(&self, job: ReminderJob, generation: Option<u64>) -> Registration {
        let identifier = job.identifier.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let gate = Arc::clone(&self.generation);

        let handle = tokio::spawn(async move {
            let identifier = job.identifier.clone();
            let result = add_if_current(dispatcher.as_ref(), &gate, job, generation).await;

            match &result {
                Ok(()) => {}
                Err(AppError::Superseded(_)) => {
                    tracing::debug!("Skipping superseded reminder {}", identifier)
                }
                Err(e) => tracing::error!("Error scheduling notification {}: {}", identifier, e),
            }

            result
        });

        Registration { identifier, handle }
    }
}

async fn add_if_current(
    dispatcher: &dyn ReminderDispatcher,
    gate: &RwLock<u64>,
    job: ReminderJob,
    generation: Option<u64>,
) -> Result<()> {
    let Some(expected) = generation else {
        return dispatcher.add(job).await;
    };

    let current = gate.read().await;
    if *current != expected {
        return Err(AppError::Superseded(job.identifier));
    }
    dispatcher.add(job).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::new_affirmation;
    use crate::dispatch::{InMemoryDispatcher, Trigger};
    use chrono::{NaiveDate, Weekday};

    fn service(dispatcher: &InMemoryDispatcher, seed: u64) -> NotificationService {
        NotificationService::with_rng(Arc::new(dispatcher.clone()), StdRng::seed_from_u64(seed))
    }

    fn pool(contents: &[&str]) -> Vec<Affirmation> {
        contents.iter().map(|c| new_affirmation(*c)).collect()
    }

    fn times(count: usize) -> Vec<TimeOfDay> {
        (0..count)
            .map(|i| TimeOfDay::new(8 + i as u8, 0).unwrap())
            .collect()
    }

    async fn settle(outcome: ScheduleOutcome) {
        for (identifier, result) in outcome.completions().await {
            assert!(result.is_ok(), "{} failed: {:?}", identifier, result);
        }
    }

    #[tokio::test]
    async fn test_weekly_single_time() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 1);

        let outcome = service
            .schedule(&pool(&["A", "B", "C"]), Frequency::Weekly, &times(1))
            .await
            .unwrap();
        settle(outcome).await;

        let pending = dispatcher.pending_jobs().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].identifier, "weekly-affirmation-0");
        assert!(["A", "B", "C"].contains(&pending[0].body.as_str()));
        assert_eq!(
            pending[0].trigger,
            Trigger::Weekly {
                weekday: Weekday::Sun,
                time: TimeOfDay::new(8, 0).unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_counts_per_frequency() {
        let affirmations = pool(&["A", "B", "C", "D"]);

        for (frequency, expected) in [
            (Frequency::Daily, 3),
            (Frequency::Weekly, 3),
            (Frequency::Weekdays, 15),
        ] {
            let dispatcher = InMemoryDispatcher::new();
            let outcome = service(&dispatcher, 2)
                .schedule(&affirmations, frequency, &times(3))
                .await
                .unwrap();
            assert_eq!(outcome.jobs.len(), expected);
            settle(outcome).await;
            assert_eq!(dispatcher.pending_jobs().await.len(), expected);
        }
    }

    #[tokio::test]
    async fn test_empty_pool_schedules_nothing() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 3);

        settle(
            service
                .schedule(&pool(&["A"]), Frequency::Daily, &times(2))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(dispatcher.pending_jobs().await.len(), 2);

        let outcome = service
            .schedule(&[], Frequency::Daily, &times(5))
            .await
            .unwrap();
        assert!(outcome.jobs.is_empty());
        assert!(outcome.registrations.is_empty());
        // Previous batch is still revoked
        assert!(dispatcher.pending_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_schedule_replaces_first() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 4);
        let affirmations = pool(&["A", "B", "C"]);

        settle(
            service
                .schedule(&affirmations, Frequency::Weekdays, &times(2))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(dispatcher.pending_jobs().await.len(), 10);

        let second = service
            .schedule(&affirmations, Frequency::Daily, &times(1))
            .await
            .unwrap();
        let expected: Vec<String> = second.jobs.iter().map(|j| j.identifier.clone()).collect();
        settle(second).await;

        assert_eq!(dispatcher.pending_identifiers().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_daily_extra_times_repeat_last_shuffled() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 5);

        let outcome = service
            .schedule(&pool(&["A", "B"]), Frequency::Daily, &times(4))
            .await
            .unwrap();

        let bodies: Vec<&str> = outcome.jobs.iter().map(|j| j.body.as_str()).collect();
        assert_ne!(bodies[0], bodies[1]);
        assert_eq!(bodies[1], bodies[2]);
        assert_eq!(bodies[2], bodies[3]);
        settle(outcome).await;
    }

    #[tokio::test]
    async fn test_seeded_shuffle_is_deterministic() {
        let affirmations = pool(&["A", "B", "C", "D", "E", "F"]);

        let first = service(&InMemoryDispatcher::new(), 42)
            .schedule(&affirmations, Frequency::Daily, &times(5))
            .await
            .unwrap();
        let second = service(&InMemoryDispatcher::new(), 42)
            .schedule(&affirmations, Frequency::Daily, &times(5))
            .await
            .unwrap();

        let bodies = |o: &ScheduleOutcome| o.jobs.iter().map(|j| j.body.clone()).collect::<Vec<_>>();
        assert_eq!(bodies(&first), bodies(&second));
    }

    #[tokio::test]
    async fn test_failed_registration_does_not_block_siblings() {
        let dispatcher = InMemoryDispatcher::new();
        dispatcher.fail_on("daily-affirmation-1").await;
        let service = service(&dispatcher, 6);

        let outcome = service
            .schedule(&pool(&["A", "B", "C"]), Frequency::Daily, &times(3))
            .await
            .unwrap();

        let results = outcome.completions().await;
        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(failed, vec!["daily-affirmation-1"]);

        assert_eq!(
            dispatcher.pending_identifiers().await.unwrap(),
            vec!["daily-affirmation-0", "daily-affirmation-2"]
        );
    }

    #[tokio::test]
    async fn test_denied_authorization_is_silent() {
        let dispatcher = InMemoryDispatcher::denied();
        let service = service(&dispatcher, 7);

        assert!(!service.request_authorization().await);

        let outcome = service
            .schedule(&pool(&["A"]), Frequency::Daily, &times(1))
            .await
            .unwrap();
        settle(outcome).await;
        assert!(dispatcher.pending_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_custom_reminder_survives_schedule() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 8);

        let at = NaiveDate::from_ymd_opt(2031, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let custom = service.schedule_custom("Just this one.", at, false).await;
        let custom_id = custom.identifier().to_string();
        custom.completion().await.unwrap();

        settle(
            service
                .schedule(&pool(&["A", "B"]), Frequency::Weekly, &times(2))
                .await
                .unwrap(),
        )
        .await;

        let identifiers = dispatcher.pending_identifiers().await.unwrap();
        assert_eq!(identifiers.len(), 3);
        assert!(identifiers.contains(&custom_id));

        service.revoke_batch().await.unwrap();
        assert_eq!(dispatcher.pending_identifiers().await.unwrap(), vec![custom_id]);

        service.clear_all().await.unwrap();
        assert!(dispatcher.pending_identifiers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remind_in_schedules_one_shot() {
        let dispatcher = InMemoryDispatcher::new();
        let service = service(&dispatcher, 9);

        service
            .remind_in("Later.", Duration::minutes(60))
            .await
            .completion()
            .await
            .unwrap();

        let pending = dispatcher.pending_jobs().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].body, "Later.");
        assert!(matches!(pending[0].trigger, Trigger::Once { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_schedules_last_writer_wins() {
        let affirmations = pool(&["A", "B", "C"]);
        let (three, one) = (times(3), times(1));

        for _ in 0..20 {
            let dispatcher = InMemoryDispatcher::new();
            let service = service(&dispatcher, 10);

            let (weekdays, weekly) = tokio::join!(
                service.schedule(&affirmations, Frequency::Weekdays, &three),
                service.schedule(&affirmations, Frequency::Weekly, &one),
            );
            let (weekdays, weekly) = (weekdays.unwrap(), weekly.unwrap());

            let mut winner: Vec<String> = if weekdays.generation() > weekly.generation() {
                weekdays.jobs.iter().map(|j| j.identifier.clone()).collect()
            } else {
                weekly.jobs.iter().map(|j| j.identifier.clone()).collect()
            };
            winner.sort();

            weekdays.completions().await;
            weekly.completions().await;

            assert_eq!(dispatcher.pending_identifiers().await.unwrap(), winner);
        }
    }
}
