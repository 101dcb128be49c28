use clap::Subcommand;

use crate::app::{App, CliResult};

#[derive(Subcommand)]
pub enum DataAction {
    /// Delete all drink records, the goal and reminder settings
    Clear {
        /// Required; clearing cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(action: DataAction) -> CliResult {
    match action {
        DataAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear data without --yes".into());
            }
            let app = App::open()?;
            app.reminders.clear_all_data().await?;
            println!("all data cleared");
        }
    }
    Ok(())
}
