//! Affirmations service
//!
//! Validation and lifecycle for affirmation records.

use crate::config::MAX_AFFIRMATION_LENGTH;
use crate::database::repository::new_affirmation;
use crate::database::{Affirmation, Repository};
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};

/// Affirmations inserted on first run
pub const SAMPLE_AFFIRMATIONS: &[&str] = &[
    "I am capable of achieving anything I set my mind to.",
    "I am deserving of love and happiness.",
    "I choose to be positive and radiate positivity.",
    "My potential is limitless, and I can do amazing things.",
    "I am grateful for all the abundance in my life.",
    "I am in control of my thoughts and emotions.",
    "I trust my intuition and make wise decisions.",
    "Every day I am becoming a better version of myself.",
    "I am surrounded by love and support.",
    "I radiate confidence, positivity, and strength.",
];

/// Trim and check an affirmation's text
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();

    if trimmed.is_empty() {
        return Err(AppError::InvalidAffirmation(
            "Affirmation cannot be empty".to_string(),
        ));
    }

    let length = trimmed.chars().count();
    if length > MAX_AFFIRMATION_LENGTH {
        return Err(AppError::InvalidAffirmation(format!(
            "Affirmation is {} characters, the limit is {}",
            length, MAX_AFFIRMATION_LENGTH
        )));
    }

    Ok(trimmed.to_string())
}

/// Service for managing affirmations
#[derive(Clone)]
pub struct AffirmationsService {
    repo: Repository,
}

impl AffirmationsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, content: &str) -> Result<Affirmation> {
        let content = validate_content(content)?;
        let affirmation = self.repo.insert_affirmation(&new_affirmation(content)).await?;

        tracing::info!("Affirmation created: {}", affirmation.id);
        Ok(affirmation)
    }

    pub async fn get(&self, id: &str) -> Result<Affirmation> {
        self.repo.get_affirmation(id).await
    }

    /// All affirmations, newest first
    pub async fn list(&self) -> Result<Vec<Affirmation>> {
        self.repo.list_affirmations().await
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<Affirmation> {
        let current = self.repo.get_affirmation(id).await?;
        self.repo.set_favorite(id, !current.is_favorite).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting affirmation: {}", id);
        self.repo.delete_affirmation(id).await
    }

    /// Insert the sample affirmations if the store is empty.
    /// Returns how many were inserted.
    pub async fn seed_samples(&self) -> Result<usize> {
        if self.repo.count_affirmations().await? > 0 {
            return Ok(0);
        }

        // Stagger timestamps so newest-first keeps the list order
        let base = Utc::now();
        for (i, content) in SAMPLE_AFFIRMATIONS.iter().enumerate() {
            let mut affirmation = new_affirmation(*content);
            affirmation.created_at = base - Duration::milliseconds(i as i64);
            self.repo.insert_affirmation(&affirmation).await?;
        }

        tracing::info!("Seeded {} sample affirmations", SAMPLE_AFFIRMATIONS.len());
        Ok(SAMPLE_AFFIRMATIONS.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> AffirmationsService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();

        AffirmationsService::new(Repository::new(pool))
    }

    #[test]
    fn test_validate_content() {
        assert_eq!(validate_content("  I am calm.\n").unwrap(), "I am calm.");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"a".repeat(150)).is_ok());
        assert!(validate_content(&"a".repeat(151)).is_err());
        // Counted in characters, not bytes
        assert!(validate_content(&"é".repeat(150)).is_ok());
    }

    #[tokio::test]
    async fn test_create_toggle_delete() {
        let service = create_test_service().await;

        let created = service.create("I am enough.").await.unwrap();
        assert!(!created.is_favorite);

        let toggled = service.toggle_favorite(&created.id).await.unwrap();
        assert!(toggled.is_favorite);
        let toggled_back = service.toggle_favorite(&created.id).await.unwrap();
        assert!(!toggled_back.is_favorite);

        service.delete(&created.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank() {
        let service = create_test_service().await;

        let result = service.create("  \t ").await;
        assert!(matches!(result, Err(AppError::InvalidAffirmation(_))));
    }

    #[tokio::test]
    async fn test_seed_samples_only_when_empty() {
        let service = create_test_service().await;

        assert_eq!(service.seed_samples().await.unwrap(), 10);
        assert_eq!(service.seed_samples().await.unwrap(), 0);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].content, SAMPLE_AFFIRMATIONS[0]);
    }
}
