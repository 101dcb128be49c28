//! Reminder controller.
//!
//! Glues the stores, the goal evaluator, the planner and the scheduler into
//! one replan cycle: read settings and records, evaluate today's goal, plan
//! the rest of the day, apply the plan. Every trigger runs the full cycle,
//! and cycles never overlap.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::planner::{ReminderPlan, ReminderPlanner};
use super::port::{NotificationPayload, NotificationPort, PayloadKind, PendingReminder};
use super::scheduler::{ApplyReport, ReminderScheduler};
use super::settings::ReminderSettings;
use crate::clock::Clock;
use crate::error::{CoreError, PortError, Result};
use crate::events::Trigger;
use crate::goal::{GoalEvaluator, GoalStatus};
use crate::storage::{DrinkRecord, RecordStore, SettingsStore};

/// Where the reminder session stands after a replan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderState {
    /// Reminders are off; nothing is pending.
    Disabled,
    /// One or more reminders are pending for today.
    Scheduled,
    /// Nothing left today (goal met or window over); the replan trigger
    /// wakes the session tomorrow.
    IdleUntilTomorrow,
}

impl ReminderState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderState::Disabled => "disabled",
            ReminderState::Scheduled => "scheduled",
            ReminderState::IdleUntilTomorrow => "idle-until-tomorrow",
        }
    }
}

/// What one replan cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct ReplanOutcome {
    pub trigger: Trigger,
    pub state: ReminderState,
    pub goal: GoalStatus,
    pub plan: ReminderPlan,
    pub report: ApplyReport,
}

/// Result of [`ReminderController::log_drink`].
#[derive(Debug, Clone, Serialize)]
pub struct DrinkLogged {
    pub record: DrinkRecord,
    /// This drink took today's total from below the goal to at or above it.
    pub goal_reached: bool,
    pub outcome: ReplanOutcome,
}

/// Every mutating operation holds `cycle` from its first read to its last
/// write, so concurrent callers get the effect of some sequential order.
pub struct ReminderController<Tz: TimeZone> {
    records: RecordStore,
    settings: SettingsStore,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    tz: Tz,
    cycle: tokio::sync::Mutex<()>,
    last_state: Mutex<Option<ReminderState>>,
}

impl<Tz: TimeZone> ReminderController<Tz> {
    pub fn new(
        records: RecordStore,
        settings: SettingsStore,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            records,
            settings,
            scheduler,
            clock,
            tz,
            cycle: tokio::sync::Mutex::new(()),
            last_state: Mutex::new(None),
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn port(&self) -> &Arc<dyn NotificationPort> {
        self.scheduler.port()
    }

    /// The current instant in the controller's time zone.
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.tz)
    }

    /// State left by the most recent completed replan, if any.
    pub fn state(&self) -> Option<ReminderState> {
        *self.last_state.lock()
    }

    /// Recompute today's plan and apply it.
    ///
    /// # Errors
    /// A failed read aborts before anything is applied, leaving the pending
    /// set untouched. Invalid settings or goal clear every pending reminder
    /// and are then returned as a configuration error. A failed cancel is
    /// returned as a port error. Per-entry submission failures are not
    /// errors; they appear in the outcome's report.
    pub async fn replan(&self, trigger: Trigger) -> Result<ReplanOutcome> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle(trigger).await
    }

    /// Record a drink at the current instant and replan.
    ///
    /// When the drink completes today's goal a `goal_achieved` notification
    /// is presented right away. The record and that notification are kept
    /// even if the following replan fails.
    pub async fn log_drink(&self, amount_ml: u32) -> Result<DrinkLogged> {
        let _cycle = self.cycle.lock().await;

        let now = self.now();
        let goal_ml = self.settings.daily_goal().await?;
        let mut records = self.records.all().await?;
        let was_complete = GoalEvaluator::evaluate(&records, goal_ml, &now)
            .map(|goal| goal.is_complete)
            .unwrap_or(true);

        let record = self.records.add(amount_ml, self.clock.now()).await?;
        records.push(record.clone());

        let goal_reached = match GoalEvaluator::evaluate(&records, goal_ml, &now) {
            Ok(goal) if goal.is_complete && !was_complete => {
                self.announce_goal(&goal).await;
                true
            }
            _ => false,
        };

        let outcome = self.run_cycle(Trigger::DrinkLogged).await?;
        Ok(DrinkLogged {
            record,
            goal_reached,
            outcome,
        })
    }

    /// Validate, persist and apply new reminder settings.
    ///
    /// # Errors
    /// Turning reminders on asks the port for permission first. On denial
    /// the new settings are still stored, with reminders off, and
    /// [`CoreError::PermissionDenied`] is returned.
    pub async fn update_settings(&self, settings: ReminderSettings) -> Result<ReplanOutcome> {
        settings.validate()?;
        let _cycle = self.cycle.lock().await;

        let current = self.settings.reminder_settings().await?;
        if settings.enabled && !current.enabled && !self.permission_granted().await? {
            let disabled = ReminderSettings {
                enabled: false,
                ..settings
            };
            self.settings.save_reminder_settings(&disabled).await?;
            return self.permission_denied().await;
        }
        self.settings.save_reminder_settings(&settings).await?;
        self.run_cycle(Trigger::SettingsChanged).await
    }

    /// Turn reminders on or off.
    ///
    /// # Errors
    /// When enabling and the port denies permission, reminders are stored as
    /// disabled, every pending entry is cancelled and
    /// [`CoreError::PermissionDenied`] is returned.
    pub async fn set_enabled(&self, enabled: bool) -> Result<ReplanOutcome> {
        let _cycle = self.cycle.lock().await;

        if enabled && !self.permission_granted().await? {
            self.settings.set_reminders_enabled(false).await?;
            return self.permission_denied().await;
        }
        self.settings.set_reminders_enabled(enabled).await?;
        self.run_cycle(Trigger::SettingsChanged).await
    }

    pub async fn set_goal(&self, goal_ml: i64) -> Result<ReplanOutcome> {
        let _cycle = self.cycle.lock().await;
        self.settings.set_daily_goal(goal_ml).await?;
        self.run_cycle(Trigger::SettingsChanged).await
    }

    /// Today's goal progress without touching the pending set.
    pub async fn goal_status(&self) -> Result<GoalStatus> {
        let goal_ml = self.settings.daily_goal().await?;
        let records = self.records.all().await?;
        Ok(GoalEvaluator::evaluate(&records, goal_ml, &self.now())?)
    }

    pub async fn pending(&self) -> Result<Vec<PendingReminder>> {
        Ok(self.port().list_pending().await?)
    }

    /// Remove records, goal and reminder settings, then replan with defaults.
    pub async fn clear_all_data(&self) -> Result<ReplanOutcome> {
        let _cycle = self.cycle.lock().await;
        self.records.clear().await?;
        self.settings.clear().await?;
        info!("all drink records and settings cleared");
        self.run_cycle(Trigger::SettingsChanged).await
    }

    /// One read, plan, apply pass. Callers hold `cycle`.
    async fn run_cycle(&self, trigger: Trigger) -> Result<ReplanOutcome> {
        let now = self.now();
        let (settings, goal_ml, records) = match self.read_state().await {
            Ok(state) => state,
            Err(e) => {
                error!(trigger = trigger.as_str(), error = %e, "reading state failed, replan aborted");
                return Err(e.into());
            }
        };

        let checked = GoalEvaluator::evaluate(&records, goal_ml, &now).and_then(|goal| {
            if settings.enabled {
                settings.validate_for_planning()?;
            }
            Ok(goal)
        });
        let goal = match checked {
            Ok(goal) => goal,
            Err(e) => {
                warn!(trigger = trigger.as_str(), error = %e, "configuration invalid, clearing pending reminders");
                self.scheduler.apply(&ReminderPlan::default()).await?;
                self.transition(ReminderState::Disabled);
                return Err(e.into());
            }
        };

        let last_drink_at = records.iter().map(|r| r.occurred_at).max();
        let plan = ReminderPlanner::plan(&now, &settings, last_drink_at, &goal);
        let report = self.scheduler.apply(&plan).await?;

        let state = if !settings.enabled {
            ReminderState::Disabled
        } else if plan.is_empty() {
            ReminderState::IdleUntilTomorrow
        } else {
            ReminderState::Scheduled
        };
        self.transition(state);

        info!(
            trigger = trigger.as_str(),
            state = state.as_str(),
            consumed_ml = goal.consumed_ml,
            goal_ml = goal.goal_ml,
            reminders = plan.reminders.len(),
            failures = report.failures.len(),
            "replan complete"
        );

        Ok(ReplanOutcome {
            trigger,
            state,
            goal,
            plan,
            report,
        })
    }

    async fn read_state(&self) -> Result<(ReminderSettings, i64, Vec<DrinkRecord>), PortError> {
        let settings = self.settings.reminder_settings().await?;
        let goal_ml = self.settings.daily_goal().await?;
        let records = self.records.all().await?;
        Ok((settings, goal_ml, records))
    }

    async fn permission_granted(&self) -> Result<bool> {
        let granted = self.port().request_permission().await?;
        if !granted {
            warn!("notification permission denied, reminders stay disabled");
        }
        Ok(granted)
    }

    /// Replan with the reminders-off settings just stored, then report the
    /// denial.
    async fn permission_denied(&self) -> Result<ReplanOutcome> {
        self.run_cycle(Trigger::SettingsChanged).await?;
        Err(CoreError::PermissionDenied)
    }

    async fn announce_goal(&self, goal: &GoalStatus) {
        let payload = NotificationPayload {
            body: format!("You drank {} ml today, goal {} ml.", goal.consumed_ml, goal.goal_ml),
            ..NotificationPayload::for_kind(PayloadKind::GoalAchieved)
        };
        match self.port().present(payload).await {
            Ok(id) => info!(id = %id, consumed_ml = goal.consumed_ml, "daily goal reached"),
            Err(e) => warn!(error = %e, "goal notification failed"),
        }
    }

    fn transition(&self, next: ReminderState) {
        let mut last = self.last_state.lock();
        if *last != Some(next) {
            debug!(from = ?last.map(ReminderState::as_str), to = next.as_str(), "reminder state changed");
            *last = Some(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ConfigError;
    use crate::reminder::MemoryNotifier;
    use crate::storage::{KeyValueStore, MemoryStore};
    use chrono::{Duration, FixedOffset, Utc};

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        port: Arc<MemoryNotifier>,
        controller: ReminderController<FixedOffset>,
    }

    fn fixture(hour: u32, permission: bool) -> Fixture {
        fixture_over(Arc::new(MemoryStore::new()), hour, permission)
    }

    fn fixture_over(kv: Arc<dyn KeyValueStore>, hour: u32, permission: bool) -> Fixture {
        let start = tz()
            .with_ymd_and_hms(2025, 8, 4, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(start));
        let port = Arc::new(MemoryNotifier::with_permission(permission));
        let controller = ReminderController::new(
            RecordStore::new(kv.clone()),
            SettingsStore::new(kv),
            ReminderScheduler::new(port.clone()),
            clock.clone(),
            tz(),
        );
        Fixture {
            clock,
            port,
            controller,
        }
    }

    fn enabled(smart_mode: bool) -> ReminderSettings {
        ReminderSettings {
            enabled: true,
            interval_minutes: 60,
            smart_mode,
            active_start_hour: 7,
            active_end_hour: 22,
        }
    }

    #[tokio::test]
    async fn defaults_are_disabled_with_nothing_pending() {
        let f = fixture(9, true);
        let outcome = f.controller.replan(Trigger::AppResumed).await.unwrap();
        assert_eq!(outcome.state, ReminderState::Disabled);
        assert!(f.port.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enabling_schedules_the_rest_of_the_day() {
        let f = fixture(9, true);
        let outcome = f.controller.update_settings(enabled(true)).await.unwrap();
        assert_eq!(outcome.state, ReminderState::Scheduled);
        // 10:00 through 22:00 plus the replan trigger
        assert_eq!(outcome.plan.reminders.len(), 13);
        assert_eq!(f.port.list_pending().await.unwrap().len(), 14);
    }

    #[tokio::test]
    async fn logging_a_drink_realigns_the_plan() {
        let f = fixture(9, true);
        f.controller.update_settings(enabled(false)).await.unwrap();

        f.clock.advance(Duration::minutes(20));
        let logged = f.controller.log_drink(250).await.unwrap();

        assert_eq!(logged.record.amount_ml, 250);
        assert!(!logged.goal_reached);
        assert_eq!(logged.outcome.trigger, Trigger::DrinkLogged);
        assert_eq!(
            logged.outcome.plan.first().unwrap().fire_at,
            logged.record.occurred_at + Duration::minutes(60)
        );
    }

    #[tokio::test]
    async fn meeting_the_goal_goes_idle() {
        let f = fixture(9, true);
        f.controller.update_settings(enabled(true)).await.unwrap();

        let logged = f.controller.log_drink(2500).await.unwrap();
        assert!(logged.outcome.goal.is_complete);
        assert_eq!(logged.outcome.state, ReminderState::IdleUntilTomorrow);
        assert_eq!(f.controller.state(), Some(ReminderState::IdleUntilTomorrow));

        let pending = f.port.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].is_one_shot());
    }

    #[tokio::test]
    async fn goal_is_announced_once_on_the_crossing_drink() {
        let f = fixture(9, true);
        f.controller.set_goal(1000).await.unwrap();

        assert!(!f.controller.log_drink(600).await.unwrap().goal_reached);
        let crossing = f.controller.log_drink(500).await.unwrap();
        assert!(crossing.goal_reached);
        assert!(!f.controller.log_drink(200).await.unwrap().goal_reached);

        let shown = f.port.presented();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, PayloadKind::GoalAchieved);
        assert!(shown[0].body.contains("1100 ml"));
        // the announcement is not part of the reminder set
        assert!(f.port.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn goal_is_announced_even_with_reminders_off() {
        let f = fixture(9, true);
        let logged = f.controller.log_drink(2000).await.unwrap();
        assert!(logged.goal_reached);
        assert_eq!(logged.outcome.state, ReminderState::Disabled);
        assert_eq!(f.port.presented().len(), 1);
    }

    #[tokio::test]
    async fn permission_denial_disables_and_reports_once() {
        let f = fixture(9, false);
        let err = f.controller.set_enabled(true).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied));

        let stored = f.controller.settings().reminder_settings().await.unwrap();
        assert!(!stored.enabled);
        assert!(f.port.list_pending().await.unwrap().is_empty());

        // later background replans are quiet
        let outcome = f.controller.replan(Trigger::AppResumed).await.unwrap();
        assert_eq!(outcome.state, ReminderState::Disabled);
    }

    #[tokio::test]
    async fn denied_settings_update_keeps_the_new_schedule() {
        let f = fixture(9, false);
        let wanted = ReminderSettings {
            interval_minutes: 45,
            active_start_hour: 8,
            active_end_hour: 20,
            ..enabled(true)
        };

        let err = f.controller.update_settings(wanted).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied));

        let stored = f.controller.settings().reminder_settings().await.unwrap();
        assert_eq!(
            stored,
            ReminderSettings {
                enabled: false,
                ..wanted
            }
        );
        assert!(f.port.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabling_cancels_everything() {
        let f = fixture(9, true);
        f.controller.set_enabled(true).await.unwrap();
        assert!(!f.port.list_pending().await.unwrap().is_empty());

        let outcome = f.controller.set_enabled(false).await.unwrap();
        assert_eq!(outcome.state, ReminderState::Disabled);
        assert!(f.port.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_saving() {
        let f = fixture(9, true);
        let bad = ReminderSettings {
            interval_minutes: 0,
            ..enabled(false)
        };
        let err = f.controller.update_settings(bad).await.unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::InvalidInterval(0))));
        assert!(!f.controller.settings().reminder_settings().await.unwrap().enabled);
    }

    #[tokio::test]
    async fn clearing_data_resets_to_defaults() {
        let f = fixture(9, true);
        f.controller.set_goal(1500).await.unwrap();
        f.controller.set_enabled(true).await.unwrap();
        f.controller.log_drink(300).await.unwrap();

        let outcome = f.controller.clear_all_data().await.unwrap();
        assert_eq!(outcome.state, ReminderState::Disabled);
        assert_eq!(outcome.goal.consumed_ml, 0);
        assert_eq!(outcome.goal.goal_ml, 2000);
        assert!(f.controller.records().all().await.unwrap().is_empty());
        assert!(f.port.list_pending().await.unwrap().is_empty());
    }

    /// Sleeps before every store call so overlapping operations interleave.
    struct SlowStore(MemoryStore);

    #[async_trait::async_trait]
    impl KeyValueStore for SlowStore {
        async fn get(&self, key: &str) -> std::result::Result<Option<String>, PortError> {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> std::result::Result<(), PortError> {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.0.set(key, value).await
        }

        async fn remove(&self, key: &str) -> std::result::Result<(), PortError> {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.0.remove(key).await
        }

        async fn update(
            &self,
            key: &str,
            apply: &mut (dyn FnMut(Option<String>) -> std::result::Result<Option<String>, PortError>
                      + Send),
        ) -> std::result::Result<(), PortError> {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            self.0.update(key, apply).await
        }
    }

    fn sorted_ids(pending: &[PendingReminder]) -> Vec<String> {
        let mut ids: Vec<String> = pending.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_calls_leave_a_sequentially_reachable_set() {
        let f = fixture_over(Arc::new(SlowStore(MemoryStore::new())), 9, true);
        let port = f.port.clone();
        let controller = Arc::new(f.controller);
        controller.update_settings(enabled(false)).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..12u32 {
            let controller = controller.clone();
            tasks.spawn(async move {
                match i % 3 {
                    0 => controller
                        .update_settings(ReminderSettings {
                            interval_minutes: 30 + i,
                            ..enabled(false)
                        })
                        .await
                        .map(|_| ()),
                    1 => controller.log_drink(100).await.map(|_| ()),
                    _ => controller.replan(Trigger::AppResumed).await.map(|_| ()),
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let after_burst = sorted_ids(&port.list_pending().await.unwrap());
        let outcome = controller.replan(Trigger::AppResumed).await.unwrap();
        let after_replan = sorted_ids(&port.list_pending().await.unwrap());

        assert_eq!(after_burst, after_replan);
        assert_eq!(after_replan.len(), outcome.plan.reminders.len() + 1);
        assert_eq!(outcome.goal.consumed_ml, 400);
    }

    #[tokio::test]
    async fn goal_status_counts_only_today() {
        let f = fixture(23, true);
        f.controller.log_drink(400).await.unwrap();
        f.clock.advance(Duration::hours(2));
        f.controller.log_drink(100).await.unwrap();

        let status = f.controller.goal_status().await.unwrap();
        assert_eq!(status.consumed_ml, 100);
    }
}
