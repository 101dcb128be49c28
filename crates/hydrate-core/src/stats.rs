//! Weekly intake statistics.

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::clock::week_start;
use crate::storage::DrinkRecord;

/// Total for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub amount_ml: i64,
    pub is_today: bool,
}

/// Sunday-to-Saturday summary of the week containing a reference instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub days: Vec<DayTotal>,
    pub total_ml: i64,
    /// Total divided over all seven days, rounded.
    pub average_ml: i64,
    /// Days whose total met the goal.
    pub completed_days: u32,
    /// `completed_days` as a rounded percentage of seven.
    pub completion_rate: u32,
}

impl WeeklySummary {
    pub fn compute<Tz: TimeZone>(
        records: &[DrinkRecord],
        goal_ml: i64,
        as_of: &DateTime<Tz>,
    ) -> Self {
        let tz = as_of.timezone();
        let today = as_of.date_naive();
        let start = week_start(today);

        let days: Vec<DayTotal> = (0..7)
            .map(|offset| {
                let date = start + Duration::days(offset);
                let amount_ml = records
                    .iter()
                    .filter(|r| r.occurred_at.with_timezone(&tz).date_naive() == date)
                    .map(|r| i64::from(r.amount_ml))
                    .sum();
                DayTotal {
                    date,
                    amount_ml,
                    is_today: date == today,
                }
            })
            .collect();

        let total_ml: i64 = days.iter().map(|d| d.amount_ml).sum();
        let completed_days = days.iter().filter(|d| d.amount_ml >= goal_ml).count() as u32;

        Self {
            total_ml,
            average_ml: (total_ml + 3) / 7,
            completed_days,
            completion_rate: (completed_days * 100 + 3) / 7,
            days,
        }
    }
}
