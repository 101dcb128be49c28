//! Reminder planning and delivery.
//!
//! - [`ReminderPlanner`] turns settings, the last drink and today's goal
//!   status into the remaining reminders for the day
//! - [`ReminderScheduler`] replaces the delivery port's pending set with a plan
//! - [`ReminderController`] runs the full replan cycle for a [`Trigger`]
//! - [`ReminderService`] serializes controller calls through a mailbox
//!
//! [`Trigger`]: crate::events::Trigger

mod controller;
mod outbox;
mod planner;
mod port;
mod scheduler;
mod service;
mod settings;

pub use controller::{DrinkLogged, ReminderController, ReminderState, ReplanOutcome};
pub use outbox::OutboxNotifier;
pub use planner::{PlannedReminder, ReminderKind, ReminderPlan, ReminderPlanner, ReplanTrigger};
pub use port::{
    MemoryNotifier, NotificationPayload, NotificationPort, NotificationTrigger, PayloadKind,
    PendingReminder,
};
pub use scheduler::{ApplyReport, ReminderScheduler, SubmissionFailure};
pub use service::{ReminderHandle, ReminderService};
pub use settings::ReminderSettings;
