//! Affirmations library
//!
//! Affirmation records, the notification preference and the reminder
//! scheduling engine, exposed for the binary and for testing.

pub mod app;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod services;
