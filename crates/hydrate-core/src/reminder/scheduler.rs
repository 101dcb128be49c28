//! Applies reminder plans to the delivery port.
//!
//! Applying replaces the port's whole pending set with the plan's one-shots
//! and its daily replan trigger. Applications are serialized so two
//! concurrent replans never interleave; ports that persist the set swap it in
//! one atomic write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::planner::ReminderPlan;
use super::port::{
    NotificationPayload, NotificationPort, NotificationTrigger, PayloadKind, PendingReminder,
};
use crate::error::PortError;

/// One entry the port refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFailure {
    /// `None` for the daily replan trigger.
    pub fire_at: Option<DateTime<Utc>>,
    pub kind: PayloadKind,
    pub error: String,
}

/// Result of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Ids the port accepted, in submission order.
    pub submitted: Vec<String>,
    pub failures: Vec<SubmissionFailure>,
    pub replan_armed: bool,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ReminderScheduler {
    port: Arc<dyn NotificationPort>,
    gate: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(port: Arc<dyn NotificationPort>) -> Self {
        Self {
            port,
            gate: Mutex::new(()),
        }
    }

    pub fn port(&self) -> &Arc<dyn NotificationPort> {
        &self.port
    }

    /// Replace everything pending with `plan`.
    ///
    /// A failing cancel aborts before anything is submitted. Individual
    /// submission failures do not abort; they are collected in the report
    /// and the remaining entries are still submitted.
    pub async fn apply(&self, plan: &ReminderPlan) -> Result<ApplyReport, PortError> {
        let _guard = self.gate.lock().await;

        let entries: Vec<PendingReminder> = plan
            .reminders
            .iter()
            .map(|reminder| {
                PendingReminder::new(
                    NotificationPayload::for_kind(reminder.kind.payload_kind()),
                    NotificationTrigger::Once { at: reminder.fire_at },
                )
            })
            .chain(plan.replan.map(|replan| {
                PendingReminder::new(
                    NotificationPayload::for_kind(PayloadKind::ScheduleSetup),
                    NotificationTrigger::Daily {
                        hour: replan.hour,
                        minute: replan.minute,
                    },
                )
            }))
            .collect();

        let results = self.port.replace_pending(entries.clone()).await.map_err(|e| {
            error!(error = %e, "cancelling pending reminders failed, plan not applied");
            e
        })?;

        let mut report = ApplyReport::default();
        for (entry, result) in entries.iter().zip(results) {
            let fire_at = match entry.trigger {
                NotificationTrigger::Once { at } => Some(at),
                NotificationTrigger::Daily { .. } => None,
            };
            match result {
                Ok(id) => {
                    report.submitted.push(id);
                    if fire_at.is_none() {
                        report.replan_armed = true;
                    }
                }
                Err(e) => {
                    match fire_at {
                        Some(at) => warn!(fire_at = %at, kind = %entry.kind(), error = %e, "reminder submission failed"),
                        None => warn!(error = %e, "daily replan submission failed"),
                    }
                    report.failures.push(SubmissionFailure {
                        fire_at,
                        kind: entry.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if report.is_clean() {
            debug!(submitted = report.submitted.len(), "plan applied");
        } else {
            info!(
                submitted = report.submitted.len(),
                failed = report.failures.len(),
                "plan applied with failures"
            );
        }
        Ok(report)
    }

    /// Cancel everything pending, serialized with [`Self::apply`].
    pub async fn cancel_all(&self) -> Result<(), PortError> {
        let _guard = self.gate.lock().await;
        self.port.cancel_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::planner::{PlannedReminder, ReminderKind, ReplanTrigger};
    use crate::reminder::port::MemoryNotifier;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn plan(count: i64) -> ReminderPlan {
        let base = Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();
        ReminderPlan {
            reminders: (0..count)
                .map(|i| PlannedReminder {
                    fire_at: base + Duration::hours(i),
                    kind: ReminderKind::SmartWindow,
                })
                .collect(),
            replan: Some(ReplanTrigger {
                hour: 6,
                minute: 0,
                next_at: base + Duration::hours(21),
            }),
        }
    }

    /// Refuses one-shots at a given hour and, optionally, every cancel.
    struct FlakyNotifier {
        inner: MemoryNotifier,
        refuse_hour: Option<u32>,
        refuse_cancel: bool,
    }

    #[async_trait]
    impl NotificationPort for FlakyNotifier {
        async fn request_permission(&self) -> Result<bool, PortError> {
            Ok(true)
        }

        async fn schedule_one_shot(
            &self,
            fire_at: DateTime<Utc>,
            payload: NotificationPayload,
        ) -> Result<String, PortError> {
            use chrono::Timelike;
            if Some(fire_at.hour()) == self.refuse_hour {
                return Err(PortError::SubmitFailed("quota exceeded".into()));
            }
            self.inner.schedule_one_shot(fire_at, payload).await
        }

        async fn schedule_repeating_daily(
            &self,
            hour: u8,
            minute: u8,
            payload: NotificationPayload,
        ) -> Result<String, PortError> {
            self.inner.schedule_repeating_daily(hour, minute, payload).await
        }

        async fn cancel_all(&self) -> Result<(), PortError> {
            if self.refuse_cancel {
                return Err(PortError::CancelFailed("port unavailable".into()));
            }
            self.inner.cancel_all().await
        }

        async fn list_pending(&self) -> Result<Vec<PendingReminder>, PortError> {
            self.inner.list_pending().await
        }

        async fn present(&self, payload: NotificationPayload) -> Result<String, PortError> {
            self.inner.present(payload).await
        }
    }

    #[tokio::test]
    async fn applying_twice_leaves_the_same_pending_set() {
        let port = Arc::new(MemoryNotifier::new());
        let scheduler = ReminderScheduler::new(port.clone());

        let first = scheduler.apply(&plan(3)).await.unwrap();
        let mut after_first = port.list_pending().await.unwrap();
        let second = scheduler.apply(&plan(3)).await.unwrap();
        let mut after_second = port.list_pending().await.unwrap();

        after_first.sort_by(|a, b| a.id.cmp(&b.id));
        after_second.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(after_first, after_second);
        assert_eq!(after_first.len(), 4);
        assert_eq!(first, second);
        assert!(first.replan_armed);
    }

    #[tokio::test]
    async fn new_plan_replaces_old_entries() {
        let port = Arc::new(MemoryNotifier::new());
        let scheduler = ReminderScheduler::new(port.clone());

        scheduler.apply(&plan(5)).await.unwrap();
        scheduler.apply(&plan(1)).await.unwrap();

        let pending = port.list_pending().await.unwrap();
        assert_eq!(pending.iter().filter(|p| p.is_one_shot()).count(), 1);
        assert!(pending
            .iter()
            .any(|p| p.trigger == NotificationTrigger::Daily { hour: 6, minute: 0 }));
    }

    #[tokio::test]
    async fn submission_failure_is_reported_and_rest_still_submitted() {
        let port = Arc::new(FlakyNotifier {
            inner: MemoryNotifier::new(),
            refuse_hour: Some(10),
            refuse_cancel: false,
        });
        let scheduler = ReminderScheduler::new(port.clone());

        let report = scheduler.apply(&plan(3)).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, PayloadKind::SmartReminder);
        assert_eq!(report.submitted.len(), 3);
        assert!(report.replan_armed);
        assert_eq!(port.list_pending().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancel_failure_aborts_before_submitting() {
        let port = Arc::new(FlakyNotifier {
            inner: MemoryNotifier::new(),
            refuse_hour: None,
            refuse_cancel: true,
        });
        let scheduler = ReminderScheduler::new(port.clone());

        let err = scheduler.apply(&plan(2)).await.unwrap_err();
        assert!(matches!(err, PortError::CancelFailed(_)));
        assert!(port.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_plan_clears_everything() {
        let port = Arc::new(MemoryNotifier::new());
        let scheduler = ReminderScheduler::new(port.clone());

        scheduler.apply(&plan(2)).await.unwrap();
        let report = scheduler.apply(&ReminderPlan::default()).await.unwrap();

        assert!(report.submitted.is_empty());
        assert!(!report.replan_armed);
        assert!(port.list_pending().await.unwrap().is_empty());
    }
}
