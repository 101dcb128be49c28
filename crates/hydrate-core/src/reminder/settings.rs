use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// User-facing reminder configuration.
///
/// Serialized with the field names the settings screen has always written
/// (`interval`, `smart`, `startHour`, `endHour`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    #[serde(rename = "interval")]
    pub interval_minutes: u32,
    #[serde(rename = "smart")]
    pub smart_mode: bool,
    #[serde(rename = "startHour")]
    pub active_start_hour: u8,
    #[serde(rename = "endHour")]
    pub active_end_hour: u8,
}

impl ReminderSettings {
    /// Checks what the planner cannot work around: a zero interval or an
    /// hour outside the clock. An inverted window is tolerated here.
    pub fn validate_for_planning(&self) -> Result<(), ConfigError> {
        if self.interval_minutes == 0 {
            return Err(ConfigError::InvalidInterval(self.interval_minutes));
        }
        if self.active_start_hour > 23 {
            return Err(ConfigError::InvalidHour {
                field: "startHour",
                value: self.active_start_hour,
            });
        }
        if self.active_end_hour > 23 {
            return Err(ConfigError::InvalidHour {
                field: "endHour",
                value: self.active_end_hour,
            });
        }
        Ok(())
    }

    /// Full validation applied before settings are persisted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for_planning()?;
        if self.active_start_hour > self.active_end_hour {
            return Err(ConfigError::InvertedWindow {
                start: self.active_start_hour,
                end: self.active_end_hour,
            });
        }
        Ok(())
    }

    /// Hour of the daily replan trigger: one hour before the active window,
    /// never earlier than 06:00.
    pub fn replan_hour(&self) -> u8 {
        self.active_start_hour.saturating_sub(1).clamp(6, 23)
    }
}
