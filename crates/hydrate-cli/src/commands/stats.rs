use clap::Subcommand;
use hydrate_core::WeeklySummary;
use serde_json::json;

use crate::app::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's progress toward the goal
    Today,
    /// Sunday-to-Saturday summary of this week
    Week,
}

pub async fn run(action: StatsAction) -> CliResult {
    let app = App::open()?;

    match action {
        StatsAction::Today => {
            let status = app.reminders.goal_status().await?;
            print_json(&json!({
                "consumed_ml": status.consumed_ml,
                "goal_ml": status.goal_ml,
                "remaining_ml": status.remaining_ml(),
                "percent": status.percent(),
                "is_complete": status.is_complete,
                "message": status.encouragement(),
            }))?;
        }
        StatsAction::Week => {
            let goal_ml = app.settings.daily_goal().await?;
            let records = app.records.all().await?;
            print_json(&WeeklySummary::compute(&records, goal_ml, &app.now()))?;
        }
    }
    Ok(())
}
