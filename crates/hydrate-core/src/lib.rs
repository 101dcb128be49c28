//! # Hydrate Core Library
//!
//! This library provides the core logic for the Hydrate water-intake tracker:
//! drink logging, daily goal evaluation and the reminder scheduling engine.
//! Every operation is available through the standalone `hydrate` CLI, which
//! is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Storage**: drink records and settings over a key-value persistence
//!   port, with a SQLite-backed store and TOML-based configuration
//! - **Goal**: pure evaluation of today's intake against the daily goal
//! - **Reminder**: a pure planner, a scheduler that applies plans to a
//!   notification delivery port, and a controller run as a single-writer
//!   service
//!
//! ## Key Components
//!
//! - [`ReminderController`]: replan cycle for each [`Trigger`]
//! - [`ReminderService`]: serialized access to the controller
//! - [`RecordStore`] and [`SettingsStore`]: persisted state
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod goal;
pub mod reminder;
pub mod stats;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, PortError, ValidationError};
pub use events::Trigger;
pub use goal::{GoalEvaluator, GoalStatus};
pub use reminder::{
    DrinkLogged, MemoryNotifier, NotificationPort, OutboxNotifier, ReminderController,
    ReminderHandle, ReminderPlan, ReminderPlanner, ReminderScheduler, ReminderService,
    ReminderSettings, ReminderState, ReplanOutcome,
};
pub use stats::WeeklySummary;
pub use storage::{
    Config, DrinkRecord, KeyValueStore, MemoryStore, QuickAddOption, RecordStore, SettingsStore,
    SqliteStore,
};
