use clap::Subcommand;

use crate::app::{App, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show the daily goal in ml
    Get,
    /// Set the daily goal in ml and replan reminders
    Set {
        /// Goal in ml
        #[arg(allow_negative_numbers = true)]
        goal: i64,
    },
}

pub async fn run(action: GoalAction) -> CliResult {
    let app = App::open()?;

    match action {
        GoalAction::Get => {
            println!("{}", app.settings.daily_goal().await?);
        }
        GoalAction::Set { goal } => {
            let outcome = app.reminders.set_goal(goal).await?;
            println!("goal set to {} ml", outcome.goal.goal_ml);
        }
    }
    Ok(())
}
