//! Daily goal evaluation.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::clock::same_local_day;
use crate::error::ConfigError;
use crate::storage::DrinkRecord;

/// Progress toward today's goal. Derived fresh on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub consumed_ml: i64,
    pub goal_ml: i64,
    pub is_complete: bool,
}

impl GoalStatus {
    pub fn remaining_ml(&self) -> i64 {
        (self.goal_ml - self.consumed_ml).max(0)
    }

    /// Rounded percentage of the goal reached; may exceed 100.
    pub fn percent(&self) -> i64 {
        if self.goal_ml <= 0 {
            return 100;
        }
        (self.consumed_ml * 100 + self.goal_ml / 2) / self.goal_ml
    }

    /// A short nudge matched to how far along the day is.
    pub fn encouragement(&self) -> String {
        let percent = self.percent();
        if self.is_complete {
            format!("Goal reached: {} ml of {} ml today", self.consumed_ml, self.goal_ml)
        } else if percent < 25 {
            format!("Keep going! {} ml left to reach today's goal", self.remaining_ml())
        } else if percent < 50 {
            format!("Nice! {percent}% done, keep it up")
        } else if percent < 75 {
            "Great, more than halfway there".to_string()
        } else {
            format!("Almost there, just {} ml to go", self.remaining_ml())
        }
    }
}

/// Sums today's drinks against the goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalEvaluator;

impl GoalEvaluator {
    /// Evaluate `records` against `goal_ml` for the local day containing `as_of`.
    ///
    /// Only records on that local calendar day count; anything from the day
    /// before or after is ignored.
    ///
    /// # Errors
    /// A non-positive goal is a configuration error and is returned as such.
    pub fn evaluate<Tz: TimeZone>(
        records: &[DrinkRecord],
        goal_ml: i64,
        as_of: &DateTime<Tz>,
    ) -> Result<GoalStatus, ConfigError> {
        if goal_ml <= 0 {
            return Err(ConfigError::InvalidGoal(goal_ml));
        }

        let consumed_ml = records
            .iter()
            .filter(|r| same_local_day(&r.occurred_at, as_of))
            .map(|r| i64::from(r.amount_ml))
            .sum::<i64>();

        Ok(GoalStatus {
            consumed_ml,
            goal_ml,
            is_complete: consumed_ml >= goal_ml,
        })
    }
}
