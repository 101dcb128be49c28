//! Notification delivery port.
//!
//! The core never shows a notification itself. It hands one-shot and daily
//! repeating entries to a [`NotificationPort`], and the platform layer behind
//! the port decides how to display them based on the payload kind.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PortError;

/// Tag the delivery layer uses to choose display behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Fixed-interval drink reminder.
    WaterReminder,
    /// Reminder inside the active-hours window.
    SmartReminder,
    /// Daily wake-up that triggers a fresh plan.
    ScheduleSetup,
    /// Shown once when a drink completes the day's goal.
    GoalAchieved,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::WaterReminder => "water_reminder",
            PayloadKind::SmartReminder => "smart_reminder",
            PayloadKind::ScheduleSetup => "schedule_setup",
            PayloadKind::GoalAchieved => "goal_achieved",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub kind: PayloadKind,
    pub title: String,
    pub body: String,
}

impl NotificationPayload {
    pub fn for_kind(kind: PayloadKind) -> Self {
        let (title, body) = match kind {
            PayloadKind::WaterReminder => ("Time for some water", "Stay hydrated and keep healthy."),
            PayloadKind::SmartReminder => ("Water time!", "Don't forget to drink some water."),
            PayloadKind::ScheduleSetup => ("Planning today's reminders", ""),
            PayloadKind::GoalAchieved => ("Goal achieved!", "You reached today's water goal."),
        };
        Self {
            kind,
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// When a pending entry fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationTrigger {
    Once { at: DateTime<Utc> },
    Daily { hour: u8, minute: u8 },
}

/// An entry held by the delivery port, not yet fired or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReminder {
    pub id: String,
    pub payload: NotificationPayload,
    pub trigger: NotificationTrigger,
}

impl PendingReminder {
    /// Builds an entry whose id is derived from its kind and trigger, so
    /// resubmitting the same plan yields the same ids.
    pub fn new(payload: NotificationPayload, trigger: NotificationTrigger) -> Self {
        let id = match trigger {
            NotificationTrigger::Once { at } => format!("{}:{}", payload.kind, at.timestamp()),
            NotificationTrigger::Daily { hour, minute } => {
                format!("{}:daily:{hour:02}{minute:02}", payload.kind)
            }
        };
        Self {
            id,
            payload,
            trigger,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        self.payload.kind
    }

    pub fn is_one_shot(&self) -> bool {
        matches!(self.trigger, NotificationTrigger::Once { .. })
    }
}

/// Platform notification capability.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Ask for (or report) permission to post notifications.
    async fn request_permission(&self) -> Result<bool, PortError>;

    async fn schedule_one_shot(
        &self,
        fire_at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<String, PortError>;

    async fn schedule_repeating_daily(
        &self,
        hour: u8,
        minute: u8,
        payload: NotificationPayload,
    ) -> Result<String, PortError>;

    /// Cancel every pending entry. Succeeds when nothing is pending.
    async fn cancel_all(&self) -> Result<(), PortError>;

    async fn list_pending(&self) -> Result<Vec<PendingReminder>, PortError>;

    /// Show `payload` right away. It never joins the pending set, so
    /// `cancel_all` does not touch it.
    async fn present(&self, payload: NotificationPayload) -> Result<String, PortError>;

    /// Swap the whole pending set for `entries`.
    ///
    /// An `Err` means the old set could not be cleared and nothing was
    /// submitted. Otherwise there is one result per entry, in order. The
    /// default cancels and then submits entry by entry; ports that can swap
    /// the set in one step override it.
    async fn replace_pending(
        &self,
        entries: Vec<PendingReminder>,
    ) -> Result<Vec<Result<String, PortError>>, PortError> {
        self.cancel_all().await?;

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = match entry.trigger {
                NotificationTrigger::Once { at } => self.schedule_one_shot(at, entry.payload).await,
                NotificationTrigger::Daily { hour, minute } => {
                    self.schedule_repeating_daily(hour, minute, entry.payload).await
                }
            };
            results.push(result);
        }
        Ok(results)
    }
}

/// In-process delivery port. Holds the pending set in memory.
#[derive(Debug)]
pub struct MemoryNotifier {
    pending: Mutex<Vec<PendingReminder>>,
    presented: Mutex<Vec<NotificationPayload>>,
    permission: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::with_permission(true)
    }

    pub fn with_permission(permission: bool) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            presented: Mutex::new(Vec::new()),
            permission,
        }
    }

    /// Everything shown through [`NotificationPort::present`], oldest first.
    pub fn presented(&self) -> Vec<NotificationPayload> {
        self.presented.lock().clone()
    }

    fn insert(&self, entry: PendingReminder) -> String {
        let id = entry.id.clone();
        let mut pending = self.pending.lock();
        pending.retain(|p| p.id != id);
        pending.push(entry);
        id
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationPort for MemoryNotifier {
    async fn request_permission(&self) -> Result<bool, PortError> {
        Ok(self.permission)
    }

    async fn schedule_one_shot(
        &self,
        fire_at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<String, PortError> {
        Ok(self.insert(PendingReminder::new(
            payload,
            NotificationTrigger::Once { at: fire_at },
        )))
    }

    async fn schedule_repeating_daily(
        &self,
        hour: u8,
        minute: u8,
        payload: NotificationPayload,
    ) -> Result<String, PortError> {
        Ok(self.insert(PendingReminder::new(
            payload,
            NotificationTrigger::Daily { hour, minute },
        )))
    }

    async fn cancel_all(&self) -> Result<(), PortError> {
        self.pending.lock().clear();
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<PendingReminder>, PortError> {
        Ok(self.pending.lock().clone())
    }

    async fn present(&self, payload: NotificationPayload) -> Result<String, PortError> {
        let mut presented = self.presented.lock();
        let id = format!("{}:now:{}", payload.kind, presented.len());
        presented.push(payload);
        Ok(id)
    }
}
