//! Error types for the affirmations application
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for the presentation layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Affirmation not found: {0}")]
    AffirmationNotFound(String),

    #[error("Invalid affirmation: {0}")]
    InvalidAffirmation(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid notification preference: {0}")]
    InvalidPreference(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Registration superseded by a newer schedule: {0}")]
    Superseded(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
