//! Cron-backed dispatcher
//!
//! Delivers reminders in-process using tokio-cron-scheduler.
//! Recurring triggers become cron jobs evaluated in local time,
//! one-shot triggers become delayed one-shot jobs.

use super::{ReminderDispatcher, ReminderJob, Trigger};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc, Weekday};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

const DELIVERY_CHANNEL_CAPACITY: usize = 64;

/// A reminder that fired
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub delivered_at: DateTime<Utc>,
}

/// Dispatcher running reminders on a local job scheduler
pub struct CronDispatcher {
    scheduler: Arc<RwLock<JobScheduler>>,
    jobs: Arc<RwLock<HashMap<String, Uuid>>>,
    deliveries: broadcast::Sender<Delivery>,
}

impl CronDispatcher {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;
        let (deliveries, _) = broadcast::channel(DELIVERY_CHANNEL_CAPACITY);

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            deliveries,
        })
    }

    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Reminder scheduler started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Reminder scheduler shutdown");
        Ok(())
    }

    /// Receive every reminder delivered from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.deliveries.subscribe()
    }

    fn build_job(&self, job: &ReminderJob) -> Result<Job> {
        let context = DeliveryContext {
            identifier: job.identifier.clone(),
            title: job.title.clone(),
            body: job.body.clone(),
            one_shot: !job.trigger.repeats(),
            jobs: Arc::clone(&self.jobs),
            deliveries: self.deliveries.clone(),
        };

        let built = match &job.trigger {
            Trigger::Once { at } => {
                let fire_at = Local
                    .from_local_datetime(at)
                    .earliest()
                    .ok_or_else(|| AppError::Dispatch(format!("Nonexistent local time {}", at)))?;
                let delay = (fire_at - Local::now()).to_std().map_err(|_| {
                    AppError::Dispatch(format!("Reminder {} is in the past", job.identifier))
                })?;

                Job::new_one_shot_async(delay, move |uuid, _l| deliver(context.clone(), uuid))
            }
            recurring => {
                let expr = cron_expression(recurring).ok_or_else(|| {
                    AppError::Dispatch(format!("No cron form for {:?}", recurring))
                })?;

                Job::new_async_tz(expr.as_str(), Local, move |uuid, _l| {
                    deliver(context.clone(), uuid)
                })
            }
        };

        built.map_err(|e| {
            AppError::Scheduler(format!("Failed to create job {}: {}", job.identifier, e))
        })
    }

    async fn remove_job(&self, job_id: &Uuid) -> Result<()> {
        let scheduler = self.scheduler.write().await;
        scheduler
            .remove(job_id)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))
    }
}

#[async_trait]
impl ReminderDispatcher for CronDispatcher {
    async fn request_authorization(&self) -> Result<bool> {
        // In-process delivery needs no permission
        Ok(true)
    }

    async fn add(&self, job: ReminderJob) -> Result<()> {
        let built = self.build_job(&job)?;
        let job_id = built.guid();

        let mut jobs = self.jobs.write().await;
        if let Some(previous) = jobs.remove(&job.identifier) {
            self.remove_job(&previous).await?;
        }

        {
            let scheduler = self.scheduler.write().await;
            scheduler
                .add(built)
                .await
                .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;
        }

        jobs.insert(job.identifier.clone(), job_id);
        tracing::debug!("Registered reminder {} ({:?})", job.identifier, job.trigger);
        Ok(())
    }

    async fn pending_identifiers(&self) -> Result<Vec<String>> {
        let mut identifiers: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        identifiers.sort();
        Ok(identifiers)
    }

    async fn remove(&self, identifiers: &[String]) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        for identifier in identifiers {
            if let Some(job_id) = jobs.remove(identifier) {
                self.remove_job(&job_id).await?;
            }
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        for (_, job_id) in jobs.drain() {
            self.remove_job(&job_id).await?;
        }
        tracing::info!("Removed all pending reminders");
        Ok(())
    }
}

#[derive(Clone)]
struct DeliveryContext {
    identifier: String,
    title: String,
    body: String,
    one_shot: bool,
    jobs: Arc<RwLock<HashMap<String, Uuid>>>,
    deliveries: broadcast::Sender<Delivery>,
}

fn deliver(context: DeliveryContext, job_id: Uuid) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        if context.one_shot {
            let mut jobs = context.jobs.write().await;
            if jobs.get(&context.identifier) == Some(&job_id) {
                jobs.remove(&context.identifier);
            }
        }

        tracing::info!("Reminder {}: {} - {}", context.identifier, context.title, context.body);

        // No subscribers is fine
        let _ = context.deliveries.send(Delivery {
            identifier: context.identifier,
            title: context.title,
            body: context.body,
            delivered_at: Utc::now(),
        });
    })
}

/// Six-field cron expression (sec min hour dom month dow) for a recurring trigger
pub fn cron_expression(trigger: &Trigger) -> Option<String> {
    match trigger {
        Trigger::Daily { time } => Some(format!("0 {} {} * * *", time.minute(), time.hour())),
        Trigger::Weekly { weekday, time } => Some(format!(
            "0 {} {} * * {}",
            time.minute(),
            time.hour(),
            weekday_name(*weekday)
        )),
        Trigger::Once { .. } => None,
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
