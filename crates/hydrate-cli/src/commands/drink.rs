use clap::Subcommand;
use serde_json::json;

use crate::app::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum DrinkAction {
    /// Log a drink and replan reminders
    Add {
        /// Amount in ml
        #[arg(required_unless_present = "quick")]
        amount: Option<u32>,
        /// Use the amount of a quick-add option instead
        #[arg(long, conflicts_with = "amount")]
        quick: Option<u32>,
    },
    /// Today's drinks
    Today,
    /// This week's drinks (from Sunday)
    Week,
}

pub async fn run(action: DrinkAction) -> CliResult {
    let app = App::open()?;

    match action {
        DrinkAction::Add { amount, quick } => {
            let amount_ml = match (amount, quick) {
                (Some(amount), _) => amount,
                (None, Some(id)) => {
                    let options = app.settings.quick_add_options().await?;
                    options
                        .iter()
                        .find(|o| o.id == id)
                        .map(|o| o.amount_ml)
                        .ok_or_else(|| format!("no quick-add option with id {id}"))?
                }
                (None, None) => return Err("an amount or --quick is required".into()),
            };

            let logged = app.reminders.log_drink(amount_ml).await?;
            let goal = &logged.outcome.goal;
            print_json(&json!({
                "record": logged.record,
                "goal": goal,
                "goal_reached": logged.goal_reached,
                "message": goal.encouragement(),
                "reminders": logged.outcome.plan.reminders.len(),
            }))?;
        }
        DrinkAction::Today => {
            print_json(&app.records.for_date(&app.now()).await?)?;
        }
        DrinkAction::Week => {
            print_json(&app.records.for_week(&app.now()).await?)?;
        }
    }
    Ok(())
}
