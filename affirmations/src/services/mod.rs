//! Services module
//!
//! Business logic services that coordinate between the record store
//! and the reminder dispatcher.

pub mod affirmations;
pub mod notifications;
pub mod planner;
pub mod preferences;

pub use affirmations::AffirmationsService;
pub use notifications::{NotificationService, Registration, ScheduleOutcome};
pub use preferences::PreferencesService;
