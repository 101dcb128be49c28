//! Goal, reminder settings and quick-add options.
//!
//! This is the only place defaults are applied: a missing goal, missing
//! settings or missing individual settings fields are filled in from the
//! constants below when read, and nowhere else.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{keys, read_json, write_json, KeyValueStore};
use crate::error::{ConfigError, PortError, Result, ValidationError};
use crate::reminder::ReminderSettings;

pub const DEFAULT_DAILY_GOAL_ML: i64 = 2000;

pub const DEFAULT_REMINDER_SETTINGS: ReminderSettings = ReminderSettings {
    enabled: false,
    interval_minutes: 60,
    smart_mode: true,
    active_start_hour: 7,
    active_end_hour: 22,
};

pub const DEFAULT_QUICK_ADD_OPTIONS: [u32; 6] = [100, 200, 250, 300, 500, 750];

/// A one-tap drink amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAddOption {
    pub id: u32,
    #[serde(rename = "amount")]
    pub amount_ml: u32,
    pub label: String,
}

impl QuickAddOption {
    pub fn new(id: u32, amount_ml: u32) -> Self {
        Self {
            id,
            amount_ml,
            label: format!("{amount_ml}ml"),
        }
    }

    /// The built-in option list.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_QUICK_ADD_OPTIONS
            .iter()
            .zip(1..)
            .map(|(&amount, id)| Self::new(id, amount))
            .collect()
    }
}

/// Stored settings as written by older builds, where any field may be absent.
#[derive(Debug, Default, Deserialize)]
struct StoredReminderSettings {
    enabled: Option<bool>,
    interval: Option<u32>,
    smart: Option<bool>,
    #[serde(rename = "startHour")]
    start_hour: Option<u8>,
    #[serde(rename = "endHour")]
    end_hour: Option<u8>,
}

impl StoredReminderSettings {
    fn with_defaults(self) -> ReminderSettings {
        let d = DEFAULT_REMINDER_SETTINGS;
        ReminderSettings {
            enabled: self.enabled.unwrap_or(d.enabled),
            interval_minutes: self.interval.unwrap_or(d.interval_minutes),
            smart_mode: self.smart.unwrap_or(d.smart_mode),
            active_start_hour: self.start_hour.unwrap_or(d.active_start_hour),
            active_end_hour: self.end_hour.unwrap_or(d.active_end_hour),
        }
    }
}

/// Settings store over the persistence port.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// The daily goal in ml. Whatever is stored is returned as-is so that a
    /// bad value reaches the goal evaluator instead of being masked here.
    pub async fn daily_goal(&self) -> Result<i64, PortError> {
        Ok(read_json(self.kv.as_ref(), keys::DAILY_GOAL)
            .await?
            .unwrap_or(DEFAULT_DAILY_GOAL_ML))
    }

    pub async fn set_daily_goal(&self, goal_ml: i64) -> Result<()> {
        if goal_ml <= 0 {
            return Err(ConfigError::InvalidGoal(goal_ml).into());
        }
        write_json(self.kv.as_ref(), keys::DAILY_GOAL, &goal_ml).await?;
        Ok(())
    }

    pub async fn reminder_settings(&self) -> Result<ReminderSettings, PortError> {
        let stored: Option<StoredReminderSettings> =
            read_json(self.kv.as_ref(), keys::NOTIFICATION_SETTINGS).await?;
        Ok(stored.unwrap_or_default().with_defaults())
    }

    /// Persist `settings` after full validation.
    pub async fn save_reminder_settings(&self, settings: &ReminderSettings) -> Result<()> {
        settings.validate()?;
        write_json(self.kv.as_ref(), keys::NOTIFICATION_SETTINGS, settings).await?;
        Ok(())
    }

    /// Persist only the enabled flag, keeping the rest of the stored settings.
    pub async fn set_reminders_enabled(&self, enabled: bool) -> Result<ReminderSettings> {
        let mut settings = self.reminder_settings().await?;
        settings.enabled = enabled;
        write_json(self.kv.as_ref(), keys::NOTIFICATION_SETTINGS, &settings).await?;
        Ok(settings)
    }

    pub async fn quick_add_options(&self) -> Result<Vec<QuickAddOption>, PortError> {
        Ok(read_json(self.kv.as_ref(), keys::QUICK_ADD_OPTIONS)
            .await?
            .unwrap_or_else(QuickAddOption::defaults))
    }

    pub async fn save_quick_add_options(&self, options: &[QuickAddOption]) -> Result<()> {
        if options.is_empty() {
            return Err(ValidationError::EmptyCollection("quick-add options".into()).into());
        }
        if let Some(bad) = options.iter().find(|o| o.amount_ml == 0) {
            return Err(ValidationError::InvalidValue {
                field: format!("quick-add option {}", bad.id),
                message: "amount must be positive".into(),
            }
            .into());
        }
        write_json(self.kv.as_ref(), keys::QUICK_ADD_OPTIONS, options).await?;
        Ok(())
    }

    pub async fn reset_quick_add_options(&self) -> Result<(), PortError> {
        self.kv.remove(keys::QUICK_ADD_OPTIONS).await
    }

    /// Forget the goal and reminder settings. Quick-add options are kept.
    pub async fn clear(&self) -> Result<(), PortError> {
        self.kv.remove(keys::DAILY_GOAL).await?;
        self.kv.remove(keys::NOTIFICATION_SETTINGS).await
    }
}
