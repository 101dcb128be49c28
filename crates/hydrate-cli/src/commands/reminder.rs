use clap::Subcommand;
use hydrate_core::Trigger;
use serde_json::json;

use crate::app::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Show reminder settings and what is pending
    Status,
    /// Turn reminders on
    Enable,
    /// Turn reminders off and cancel everything pending
    Disable,
    /// Change reminder settings
    Set {
        /// Minutes between reminders
        #[arg(long)]
        interval: Option<u32>,
        /// Only remind inside the active hours
        #[arg(long)]
        smart: Option<bool>,
        /// First active hour (0-23)
        #[arg(long)]
        start: Option<u8>,
        /// Last active hour (0-23)
        #[arg(long)]
        end: Option<u8>,
    },
    /// Recompute and apply today's plan
    Replan,
    /// List pending reminders
    Pending,
}

pub async fn run(action: ReminderAction) -> CliResult {
    let app = App::open()?;

    match action {
        ReminderAction::Status => {
            let settings = app.settings.reminder_settings().await?;
            let pending = app.reminders.pending().await?;
            let next = pending
                .iter()
                .filter_map(|p| match p.trigger {
                    hydrate_core::reminder::NotificationTrigger::Once { at } => Some(at),
                    _ => None,
                })
                .min();
            print_json(&json!({
                "settings": settings,
                "notifications_allowed": app.config.notifications.allowed,
                "pending": pending.len(),
                "next": next,
            }))?;
        }
        ReminderAction::Enable => {
            let outcome = app.reminders.set_enabled(true).await?;
            print_json(&outcome)?;
        }
        ReminderAction::Disable => {
            let outcome = app.reminders.set_enabled(false).await?;
            print_json(&outcome)?;
        }
        ReminderAction::Set {
            interval,
            smart,
            start,
            end,
        } => {
            let mut settings = app.settings.reminder_settings().await?;
            if let Some(interval) = interval {
                settings.interval_minutes = interval;
            }
            if let Some(smart) = smart {
                settings.smart_mode = smart;
            }
            if let Some(start) = start {
                settings.active_start_hour = start;
            }
            if let Some(end) = end {
                settings.active_end_hour = end;
            }
            let outcome = app.reminders.update_settings(settings).await?;
            print_json(&outcome)?;
        }
        ReminderAction::Replan => {
            let outcome = app.reminders.replan(Trigger::AppResumed).await?;
            print_json(&outcome)?;
        }
        ReminderAction::Pending => {
            print_json(&app.reminders.pending().await?)?;
        }
    }
    Ok(())
}
