use clap::Subcommand;
use hydrate_core::QuickAddOption;

use crate::app::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum QuickAddAction {
    /// List quick-add options
    List,
    /// Replace the quick-add options with the given amounts
    Set {
        /// Amounts in ml, in display order
        #[arg(required = true)]
        amounts: Vec<u32>,
    },
    /// Restore the default options
    Reset,
}

pub async fn run(action: QuickAddAction) -> CliResult {
    let app = App::open()?;

    match action {
        QuickAddAction::List => {
            print_json(&app.settings.quick_add_options().await?)?;
        }
        QuickAddAction::Set { amounts } => {
            let options: Vec<QuickAddOption> = amounts
                .into_iter()
                .zip(1u32..)
                .map(|(amount_ml, id)| QuickAddOption::new(id, amount_ml))
                .collect();
            app.settings.save_quick_add_options(&options).await?;
            print_json(&options)?;
        }
        QuickAddAction::Reset => {
            app.settings.reset_quick_add_options().await?;
            print_json(&app.settings.quick_add_options().await?)?;
        }
    }
    Ok(())
}
