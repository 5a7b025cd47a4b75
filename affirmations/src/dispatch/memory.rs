//! In-memory dispatcher
//!
//! Keeps pending reminders in a map. Used for dry runs and tests;
//! failures and authorization denial can be injected.

use super::{ReminderDispatcher, ReminderJob};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    pending: BTreeMap<String, ReminderJob>,
    failing: HashSet<String>,
    denied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDispatcher {
    state: Arc<Mutex<State>>,
}

impl InMemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose user has refused notification permission
    pub fn denied() -> Self {
        let state = State {
            denied: true,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make every future `add` for this identifier fail
    pub async fn fail_on(&self, identifier: &str) {
        self.state.lock().await.failing.insert(identifier.to_string());
    }

    /// Snapshot of pending jobs ordered by identifier
    pub async fn pending_jobs(&self) -> Vec<ReminderJob> {
        self.state.lock().await.pending.values().cloned().collect()
    }
}

#[async_trait]
impl ReminderDispatcher for InMemoryDispatcher {
    async fn request_authorization(&self) -> Result<bool> {
        Ok(!self.state.lock().await.denied)
    }

    async fn add(&self, job: ReminderJob) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.failing.contains(&job.identifier) {
            return Err(AppError::Dispatch(format!(
                "Host rejected reminder {}",
                job.identifier
            )));
        }

        if state.denied {
            tracing::debug!("Notifications not authorized, dropping {}", job.identifier);
            return Ok(());
        }

        state.pending.insert(job.identifier.clone(), job);
        Ok(())
    }

    async fn pending_identifiers(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().await.pending.keys().cloned().collect())
    }

    async fn remove(&self, identifiers: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        for identifier in identifiers {
            state.pending.remove(identifier);
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<()> {
        self.state.lock().await.pending.clear();
        Ok(())
    }
}
