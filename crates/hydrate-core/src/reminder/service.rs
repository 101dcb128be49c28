//! Single-writer reminder service.
//!
//! The controller runs inside one task that drains a mailbox, so every
//! trigger becomes a queued message and replan cycles run strictly one after
//! another. A trigger arriving during a cycle waits behind it; nothing is
//! dropped or coalesced.

use chrono::TimeZone;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::controller::{DrinkLogged, ReminderController, ReplanOutcome};
use super::port::PendingReminder;
use super::settings::ReminderSettings;
use crate::error::{CoreError, Result};
use crate::events::Trigger;
use crate::goal::GoalStatus;

const MAILBOX_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    Replan(Trigger, Reply<ReplanOutcome>),
    LogDrink(u32, Reply<DrinkLogged>),
    UpdateSettings(ReminderSettings, Reply<ReplanOutcome>),
    SetEnabled(bool, Reply<ReplanOutcome>),
    SetGoal(i64, Reply<ReplanOutcome>),
    ClearAll(Reply<ReplanOutcome>),
    GoalStatus(Reply<GoalStatus>),
    Pending(Reply<Vec<PendingReminder>>),
}

pub struct ReminderService;

impl ReminderService {
    /// Move `controller` into its own task and return a handle to it.
    ///
    /// Must be called inside a Tokio runtime. The task ends once every
    /// handle is dropped.
    pub fn spawn<Tz>(controller: ReminderController<Tz>) -> ReminderHandle
    where
        Tz: TimeZone + Send + Sync + 'static,
        Tz::Offset: Send + Sync,
    {
        let (tx, mut rx) = mpsc::channel(MAILBOX_CAPACITY);

        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    Request::Replan(trigger, reply) => {
                        let _ = reply.send(controller.replan(trigger).await);
                    }
                    Request::LogDrink(amount_ml, reply) => {
                        let _ = reply.send(controller.log_drink(amount_ml).await);
                    }
                    Request::UpdateSettings(settings, reply) => {
                        let _ = reply.send(controller.update_settings(settings).await);
                    }
                    Request::SetEnabled(enabled, reply) => {
                        let _ = reply.send(controller.set_enabled(enabled).await);
                    }
                    Request::SetGoal(goal_ml, reply) => {
                        let _ = reply.send(controller.set_goal(goal_ml).await);
                    }
                    Request::ClearAll(reply) => {
                        let _ = reply.send(controller.clear_all_data().await);
                    }
                    Request::GoalStatus(reply) => {
                        let _ = reply.send(controller.goal_status().await);
                    }
                    Request::Pending(reply) => {
                        let _ = reply.send(controller.pending().await);
                    }
                }
            }
            debug!("reminder service stopped");
        });

        ReminderHandle { tx }
    }
}

/// Cloneable sender side of the reminder service.
#[derive(Clone)]
pub struct ReminderHandle {
    tx: mpsc::Sender<Request>,
}

impl ReminderHandle {
    async fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(request(reply))
            .await
            .map_err(|_| CoreError::ServiceStopped)?;
        response.await.map_err(|_| CoreError::ServiceStopped)?
    }

    pub async fn replan(&self, trigger: Trigger) -> Result<ReplanOutcome> {
        self.call(|reply| Request::Replan(trigger, reply)).await
    }

    pub async fn log_drink(&self, amount_ml: u32) -> Result<DrinkLogged> {
        self.call(|reply| Request::LogDrink(amount_ml, reply)).await
    }

    pub async fn update_settings(&self, settings: ReminderSettings) -> Result<ReplanOutcome> {
        self.call(|reply| Request::UpdateSettings(settings, reply)).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<ReplanOutcome> {
        self.call(|reply| Request::SetEnabled(enabled, reply)).await
    }

    pub async fn set_goal(&self, goal_ml: i64) -> Result<ReplanOutcome> {
        self.call(|reply| Request::SetGoal(goal_ml, reply)).await
    }

    pub async fn clear_all_data(&self) -> Result<ReplanOutcome> {
        self.call(Request::ClearAll).await
    }

    pub async fn goal_status(&self) -> Result<GoalStatus> {
        self.call(Request::GoalStatus).await
    }

    pub async fn pending(&self) -> Result<Vec<PendingReminder>> {
        self.call(Request::Pending).await
    }
}
