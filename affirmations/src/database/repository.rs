//! Repository layer for database operations
//!
//! CRUD operations for affirmations and the notification preference.
//! Multi-row writes use transactions.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a fully-formed affirmation
    pub async fn insert_affirmation(&self, affirmation: &Affirmation) -> Result<Affirmation> {
        let stored = sqlx::query_as::<_, Affirmation>(
            r#"
            INSERT INTO affirmations (id, content, is_favorite, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&affirmation.id)
        .bind(&affirmation.content)
        .bind(affirmation.is_favorite)
        .bind(affirmation.created_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created affirmation: {}", stored.id);
        Ok(stored)
    }

    /// Get an affirmation by ID
    pub async fn get_affirmation(&self, id: &str) -> Result<Affirmation> {
        sqlx::query_as::<_, Affirmation>("SELECT * FROM affirmations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::AffirmationNotFound(id.to_string()))
    }

    /// List all affirmations, newest first
    pub async fn list_affirmations(&self) -> Result<Vec<Affirmation>> {
        let affirmations = sqlx::query_as::<_, Affirmation>(
            r#"
            SELECT * FROM affirmations
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(affirmations)
    }

    pub async fn set_favorite(&self, id: &str, is_favorite: bool) -> Result<Affirmation> {
        let affirmation = sqlx::query_as::<_, Affirmation>(
            r#"
            UPDATE affirmations SET is_favorite = ? WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(is_favorite)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AffirmationNotFound(id.to_string()))?;

        tracing::debug!("Set favorite={} on affirmation: {}", is_favorite, id);
        Ok(affirmation)
    }

    pub async fn delete_affirmation(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM affirmations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::AffirmationNotFound(id.to_string()));
        }

        tracing::debug!("Deleted affirmation: {}", id);
        Ok(())
    }

    pub async fn count_affirmations(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM affirmations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Get the notification preference singleton, if one has been stored
    pub async fn get_preference(&self) -> Result<Option<NotificationPreference>> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT * FROM notification_preferences
            ORDER BY updated_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let times = sqlx::query_as::<_, TimeRow>(
            r#"
            SELECT hour, minute FROM notification_times
            WHERE preference_id = ?
            ORDER BY hour ASC, minute ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(TimeRow::to_time)
        .collect::<Result<Vec<_>>>()?;

        let legacy_time = match (row.legacy_hour, row.legacy_minute) {
            (Some(hour), Some(minute)) => Some(TimeRow { hour, minute }.to_time()?),
            _ => None,
        };

        Ok(Some(NotificationPreference {
            id: row.id,
            enabled: row.enabled,
            frequency: Frequency::from_stored(&row.frequency),
            times,
            legacy_time,
            updated_at: row.updated_at,
        }))
    }

    /// Store a new preference together with its time sub-records
    pub async fn insert_preference(&self, preference: &NotificationPreference) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO notification_preferences
                (id, enabled, frequency, legacy_hour, legacy_minute, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&preference.id)
        .bind(preference.enabled)
        .bind(preference.frequency.as_str())
        .bind(preference.legacy_time.map(|t| i64::from(t.hour())))
        .bind(preference.legacy_time.map(|t| i64::from(t.minute())))
        .bind(preference.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_times(&mut tx, &preference.id, &preference.times).await?;

        tx.commit().await?;

        tracing::debug!("Created notification preference: {}", preference.id);
        Ok(())
    }

    /// Overwrite a stored preference, replacing all of its time sub-records
    pub async fn replace_preference(&self, preference: &NotificationPreference) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE notification_preferences
            SET enabled = ?, frequency = ?, legacy_hour = ?, legacy_minute = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(preference.enabled)
        .bind(preference.frequency.as_str())
        .bind(preference.legacy_time.map(|t| i64::from(t.hour())))
        .bind(preference.legacy_time.map(|t| i64::from(t.minute())))
        .bind(preference.updated_at)
        .bind(&preference.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidPreference(format!(
                "No stored preference with id {}",
                preference.id
            )));
        }

        sqlx::query("DELETE FROM notification_times WHERE preference_id = ?")
            .bind(&preference.id)
            .execute(&mut *tx)
            .await?;

        insert_times(&mut tx, &preference.id, &preference.times).await?;

        tx.commit().await?;

        tracing::debug!(
            "Replaced notification preference {} with {} time(s)",
            preference.id,
            preference.times.len()
        );
        Ok(())
    }
}

async fn insert_times(
    conn: &mut SqliteConnection,
    preference_id: &str,
    times: &[TimeOfDay],
) -> Result<()> {
    for time in times {
        sqlx::query(
            r#"
            INSERT INTO notification_times (id, preference_id, hour, minute)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(preference_id)
        .bind(i64::from(time.hour()))
        .bind(i64::from(time.minute()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Build a new affirmation record stamped with the current time
pub fn new_affirmation(content: impl Into<String>) -> Affirmation {
    Affirmation {
        id: Uuid::new_v4().to_string(),
        content: content.into(),
        is_favorite: false,
        created_at: Utc::now(),
    }
}
