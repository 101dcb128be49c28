//! Core error types for hydrate-core.
//!
//! Configuration problems, port failures and input validation each get their
//! own enum; [`CoreError`] ties them together for callers that only need to
//! report what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for hydrate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid settings or configuration file problems
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence or notification delivery failure
    #[error("Port failure: {0}")]
    Port(#[from] PortError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The delivery port refused notification permission
    #[error("Notification permission denied; reminders have been disabled")]
    PermissionDenied,

    /// The reminder service stopped before answering
    #[error("Reminder service is not running")]
    ServiceStopped,
}

/// Configuration-specific errors.
///
/// Callers surface these; retrying does not help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Daily goal must be a positive amount
    #[error("Daily goal must be positive, got {0} ml")]
    InvalidGoal(i64),

    /// Reminder interval must be at least one minute
    #[error("Reminder interval must be at least one minute, got {0}")]
    InvalidInterval(u32),

    /// Hour outside 0..=23
    #[error("Invalid hour for '{field}': {value} (expected 0-23)")]
    InvalidHour { field: &'static str, value: u8 },

    /// Active window that starts after it ends
    #[error("Active window starts at {start}:00 but ends at {end}:00")]
    InvertedWindow { start: u8, end: u8 },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Failures reported by the persistence or notification delivery ports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Reading a persisted value failed
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Writing a persisted value failed
    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// A persisted value could not be decoded
    #[error("Stored value for '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// Submitting a notification failed
    #[error("Failed to submit notification: {0}")]
    SubmitFailed(String),

    /// Cancelling pending notifications failed
    #[error("Failed to cancel pending notifications: {0}")]
    CancelFailed(String),

    /// Listing pending notifications failed
    #[error("Failed to list pending notifications: {0}")]
    ListFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Drink amounts must be positive
    #[error("Drink amount must be positive")]
    ZeroAmount,

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
