//! Reminder planning.
//!
//! The planner is pure: given the current instant, the reminder settings, the
//! last drink and today's goal status it returns the remaining reminders for
//! the current local day plus the daily replan trigger. It never looks past
//! today; the replan trigger regenerates tomorrow's list.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::port::PayloadKind;
use super::settings::ReminderSettings;
use crate::clock::{end_of_local_day, local_at_or_after, local_at_or_before};
use crate::goal::GoalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    /// Evenly spaced through the rest of the day.
    FixedInterval,
    /// Spaced inside the active-hours window.
    SmartWindow,
}

impl ReminderKind {
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            ReminderKind::FixedInterval => PayloadKind::WaterReminder,
            ReminderKind::SmartWindow => PayloadKind::SmartReminder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedReminder {
    pub fire_at: DateTime<Utc>,
    pub kind: ReminderKind,
}

/// Daily wake-up that forces a fresh plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplanTrigger {
    pub hour: u8,
    pub minute: u8,
    /// Next occurrence strictly after the planning instant.
    pub next_at: DateTime<Utc>,
}

/// Output of one planning pass. Ordered ascending by fire time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPlan {
    pub reminders: Vec<PlannedReminder>,
    pub replan: Option<ReplanTrigger>,
}

impl ReminderPlan {
    pub fn first(&self) -> Option<&PlannedReminder> {
        self.reminders.first()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReminderPlanner;

impl ReminderPlanner {
    /// Plan the rest of the local day containing `now`.
    pub fn plan<Tz: TimeZone>(
        now: &DateTime<Tz>,
        settings: &ReminderSettings,
        last_drink_at: Option<DateTime<Utc>>,
        goal: &GoalStatus,
    ) -> ReminderPlan {
        // Disabled cancels everything, the daily replan trigger included;
        // re-enabling replans immediately.
        if !settings.enabled {
            debug!("reminders disabled, empty plan");
            return ReminderPlan::default();
        }

        let mut plan = ReminderPlan {
            reminders: Vec::new(),
            replan: Self::replan_trigger(now, settings),
        };

        if goal.is_complete {
            debug!(consumed_ml = goal.consumed_ml, goal_ml = goal.goal_ml, "goal met, no reminders today");
            return plan;
        }

        if let Err(e) = settings.validate_for_planning() {
            warn!(error = %e, "invalid reminder settings, no reminders planned");
            return plan;
        }

        let now_utc = now.with_timezone(&Utc);
        let interval = Duration::minutes(i64::from(settings.interval_minutes));
        let anchor = match last_drink_at {
            Some(at) if at <= now_utc => Some(at),
            Some(at) => {
                debug!(last_drink_at = %at, "last drink is in the future, anchoring on now");
                None
            }
            None => None,
        };
        let candidate = first_after(anchor.unwrap_or(now_utc), now_utc, interval);

        let tz = now.timezone();
        let today = now.date_naive();

        let reminders = if settings.smart_mode {
            if settings.active_start_hour > settings.active_end_hour {
                debug!(
                    start = settings.active_start_hour,
                    end = settings.active_end_hour,
                    "active window is inverted, no smart reminders today"
                );
                return plan;
            }
            // a window edge inside a DST gap moves to the nearest valid side
            let start = local_at_or_after(&tz, today, u32::from(settings.active_start_hour), 0, 0);
            let end = local_at_or_before(&tz, today, u32::from(settings.active_end_hour), 59, 59);
            let (Some(start), Some(end)) = (start, end) else {
                return plan;
            };
            let (start, end) = (start.with_timezone(&Utc), end.with_timezone(&Utc));

            let anchored = anchor.is_some() && candidate >= start && candidate <= end;
            let first = if anchored {
                candidate
            } else if start > now_utc {
                start
            } else {
                first_after(start, now_utc, interval)
            };
            series(first, end, interval, ReminderKind::SmartWindow)
        } else {
            let Some(day_end) = end_of_local_day(&tz, today) else {
                return plan;
            };
            let last = day_end.with_timezone(&Utc) - Duration::nanoseconds(1);
            series(candidate, last, interval, ReminderKind::FixedInterval)
        };
        plan.reminders = reminders;

        debug!(
            count = plan.reminders.len(),
            first = ?plan.first().map(|r| r.fire_at),
            "reminder plan computed"
        );
        plan
    }

    fn replan_trigger<Tz: TimeZone>(
        now: &DateTime<Tz>,
        settings: &ReminderSettings,
    ) -> Option<ReplanTrigger> {
        let hour = settings.replan_hour();
        let tz = now.timezone();
        let today = now.date_naive();

        let next = match local_at_or_after(&tz, today, u32::from(hour), 0, 0) {
            Some(at) if at > *now => Some(at),
            _ => today
                .succ_opt()
                .and_then(|tomorrow| local_at_or_after(&tz, tomorrow, u32::from(hour), 0, 0)),
        }?;

        Some(ReplanTrigger {
            hour,
            minute: 0,
            next_at: next.with_timezone(&Utc),
        })
    }
}

/// First `anchor + k * interval` (k >= 1) strictly after `now`.
fn first_after(anchor: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let mut candidate = anchor + interval;
    if candidate <= now {
        let steps = (now - anchor).num_seconds() / interval.num_seconds();
        candidate = anchor + interval * i32::try_from(steps).unwrap_or(i32::MAX);
        while candidate <= now {
            candidate += interval;
        }
    }
    candidate
}

fn series(
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    interval: Duration,
    kind: ReminderKind,
) -> Vec<PlannedReminder> {
    let mut out = Vec::new();
    let mut fire_at = first;
    while fire_at <= last {
        out.push(PlannedReminder { fire_at, kind });
        fire_at += interval;
    }
    out
}
