//! Long-running delivery loop for the persistent outbox.
//!
//! Due one-shot reminders are printed to stdout as JSON lines and removed
//! from the outbox. After a long sleep only the latest missed reminder is
//! printed. Presented notifications (goal reached) are printed as they
//! arrive. When a daily replan entry comes due the service replans.
//! Other `hydrate` processes may change the pending set at any time, so it is
//! re-read on every tick.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use clap::Args;
use hydrate_core::clock::local_at_or_after;
use hydrate_core::reminder::{NotificationTrigger, PendingReminder};
use hydrate_core::Trigger;
use tracing::{debug, info};

use crate::app::{App, CliResult};

const MAX_SLEEP: Duration = Duration::from_secs(60);

#[derive(Args)]
pub struct DaemonArgs {
    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

pub async fn run(args: DaemonArgs) -> CliResult {
    let app = App::open()?;

    let outcome = app.reminders.replan(Trigger::AppResumed).await?;
    info!(state = outcome.state.as_str(), "daemon started");

    let mut last_tick = Utc::now();
    loop {
        let now = Utc::now();
        for payload in app.outbox.take_presented().await? {
            println!("{}", serde_json::to_string(&payload)?);
        }
        if let Some(due) = latest_missed(app.outbox.take_due(now).await?) {
            println!("{}", serde_json::to_string(&due.payload)?);
        }

        let pending = app.reminders.pending().await?;
        if daily_due(&pending, last_tick, now) {
            let outcome = app.reminders.replan(Trigger::DailyReplanFired).await?;
            debug!(reminders = outcome.plan.reminders.len(), "daily replan fired");
        }
        last_tick = now;

        if args.once {
            return Ok(());
        }

        let pending = app.reminders.pending().await?;
        let sleep_for = next_wake(&pending, now)
            .and_then(|at| (at - now).to_std().ok())
            .map_or(MAX_SLEEP, |d| d.min(MAX_SLEEP));
        tokio::time::sleep(sleep_for).await;
    }
}

/// The most recent of the due one-shots; the others are dropped.
fn latest_missed(due: Vec<PendingReminder>) -> Option<PendingReminder> {
    let missed = due.len();
    let latest = due.into_iter().max_by_key(|p| match p.trigger {
        NotificationTrigger::Once { at } => Some(at),
        NotificationTrigger::Daily { .. } => None,
    });
    if missed > 1 {
        debug!(dropped = missed - 1, "skipping stale reminders");
    }
    latest
}

/// Whether a daily entry's local time fell in `(since, now]`.
fn daily_due(pending: &[PendingReminder], since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let today = now.with_timezone(&Local).date_naive();
    pending.iter().any(|p| match p.trigger {
        NotificationTrigger::Daily { hour, minute } => {
            local_at_or_after(&Local, today, u32::from(hour), u32::from(minute), 0)
                .map(|at| at.with_timezone(&Utc))
                .is_some_and(|at| at > since && at <= now)
        }
        NotificationTrigger::Once { .. } => false,
    })
}

fn next_wake(pending: &[PendingReminder], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    pending
        .iter()
        .filter_map(|p| match p.trigger {
            NotificationTrigger::Once { at } => Some(at),
            NotificationTrigger::Daily { .. } => None,
        })
        .filter(|at| *at > now)
        .min()
}
