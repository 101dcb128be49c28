//! Persistent notification outbox.
//!
//! A delivery port for shells without a native notification scheduler: the
//! pending set is kept in the key-value store so that separate processes (the
//! CLI, a background daemon) see the same entries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::port::{NotificationPayload, NotificationPort, NotificationTrigger, PendingReminder};
use crate::error::PortError;
use crate::storage::{keys, read_json, update_json, KeyValueStore};

/// Every change to the pending set is one atomic update of its key.
pub struct OutboxNotifier {
    kv: Arc<dyn KeyValueStore>,
    allowed: bool,
}

impl OutboxNotifier {
    /// `allowed` is what permission requests answer.
    pub fn new(kv: Arc<dyn KeyValueStore>, allowed: bool) -> Self {
        Self { kv, allowed }
    }

    async fn insert(&self, entry: PendingReminder) -> Result<String, PortError> {
        update_json(
            self.kv.as_ref(),
            keys::PENDING_REMINDERS,
            move |pending: &mut Vec<PendingReminder>| {
                let id = entry.id.clone();
                pending.retain(|p| p.id != id);
                pending.push(entry);
                id
            },
        )
        .await
        .map_err(|e| PortError::SubmitFailed(e.to_string()))
    }

    /// Remove and return one-shot entries due at or before `now`.
    ///
    /// Daily entries stay pending; the caller decides whether one is due.
    pub async fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingReminder>, PortError> {
        update_json(
            self.kv.as_ref(),
            keys::PENDING_REMINDERS,
            |pending: &mut Vec<PendingReminder>| {
                let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(pending).into_iter().partition(
                    |p| matches!(p.trigger, NotificationTrigger::Once { at } if at <= now),
                );
                *pending = keep;
                due
            },
        )
        .await
    }

    /// Remove and return everything shown with `present` since the last call.
    pub async fn take_presented(&self) -> Result<Vec<NotificationPayload>, PortError> {
        update_json(
            self.kv.as_ref(),
            keys::NOTIFICATION_INBOX,
            |inbox: &mut Vec<NotificationPayload>| std::mem::take(inbox),
        )
        .await
    }
}

#[async_trait]
impl NotificationPort for OutboxNotifier {
    async fn request_permission(&self) -> Result<bool, PortError> {
        Ok(self.allowed)
    }

    async fn schedule_one_shot(
        &self,
        fire_at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<String, PortError> {
        self.insert(PendingReminder::new(
            payload,
            NotificationTrigger::Once { at: fire_at },
        ))
        .await
    }

    async fn schedule_repeating_daily(
        &self,
        hour: u8,
        minute: u8,
        payload: NotificationPayload,
    ) -> Result<String, PortError> {
        self.insert(PendingReminder::new(
            payload,
            NotificationTrigger::Daily { hour, minute },
        ))
        .await
    }

    async fn cancel_all(&self) -> Result<(), PortError> {
        self.kv
            .remove(keys::PENDING_REMINDERS)
            .await
            .map_err(|e| PortError::CancelFailed(e.to_string()))
    }

    async fn list_pending(&self) -> Result<Vec<PendingReminder>, PortError> {
        read_json(self.kv.as_ref(), keys::PENDING_REMINDERS)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PortError::ListFailed(e.to_string()))
    }

    /// Queued in the store; the daemon prints it on its next tick.
    async fn present(&self, payload: NotificationPayload) -> Result<String, PortError> {
        let id = format!("{}:now", payload.kind);
        update_json(
            self.kv.as_ref(),
            keys::NOTIFICATION_INBOX,
            move |inbox: &mut Vec<NotificationPayload>| inbox.push(payload),
        )
        .await
        .map_err(|e| PortError::SubmitFailed(e.to_string()))?;
        Ok(id)
    }

    async fn replace_pending(
        &self,
        entries: Vec<PendingReminder>,
    ) -> Result<Vec<Result<String, PortError>>, PortError> {
        let ids: Vec<Result<String, PortError>> =
            entries.iter().map(|entry| Ok(entry.id.clone())).collect();
        self.kv
            .update(keys::PENDING_REMINDERS, &mut |_| {
                serde_json::to_string(&entries)
                    .map(Some)
                    .map_err(|e| PortError::WriteFailed {
                        key: keys::PENDING_REMINDERS.to_string(),
                        message: e.to_string(),
                    })
            })
            .await
            .map_err(|e| PortError::CancelFailed(e.to_string()))?;
        Ok(ids)
    }
}
