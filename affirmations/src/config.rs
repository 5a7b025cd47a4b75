//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the application.

// ===== Affirmation Limits =====

/// Maximum length of an affirmation, counted in characters
pub const MAX_AFFIRMATION_LENGTH: usize = 150;

// ===== Notification Preference Limits =====

/// Maximum number of notification times per day
pub const MAX_DAILY_NOTIFICATIONS: usize = 5;

/// Fallback notification time (08:00) when none is configured
pub const DEFAULT_NOTIFICATION_HOUR: u8 = 8;
pub const DEFAULT_NOTIFICATION_MINUTE: u8 = 0;

/// Delay used by the "remind me later" action on a single affirmation
pub const DEFAULT_REMIND_DELAY_MINUTES: i64 = 60;

// ===== Notification Content =====

pub const DAILY_TITLE: &str = "Your Daily Affirmation";
pub const WEEKLY_TITLE: &str = "Your Weekly Affirmation";
pub const CUSTOM_TITLE: &str = "Custom Affirmation";

// ===== Reminder Identifiers =====

/// Identifier prefixes owned by the recurring batch.
/// Anything outside these is left alone when the batch is revoked.
pub const DAILY_IDENTIFIER_PREFIX: &str = "daily-affirmation-";
pub const WEEKLY_IDENTIFIER_PREFIX: &str = "weekly-affirmation-";
pub const WEEKDAY_IDENTIFIER_PREFIX: &str = "affirmation-";

// ===== Runtime =====

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "AFFIRMATIONS_DATA_DIR";

/// Data directory used when the environment variable is not set
pub const DEFAULT_DATA_DIR: &str = "affirmations-data";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE: &str = "affirmations.db";

/// Log filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "affirmations=debug,info";
