//! Wiring shared by every command.

use std::sync::Arc;

use chrono::{DateTime, Local};
use hydrate_core::storage::KeyValueStore;
use hydrate_core::{
    Config, OutboxNotifier, RecordStore, ReminderController, ReminderHandle, ReminderScheduler,
    ReminderService, SettingsStore, SqliteStore, SystemClock,
};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct App {
    pub config: Config,
    pub records: RecordStore,
    pub settings: SettingsStore,
    pub outbox: Arc<OutboxNotifier>,
    pub reminders: ReminderHandle,
}

impl App {
    /// Open the configured database and start the reminder service.
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.database_path()?)?);
        let outbox = Arc::new(OutboxNotifier::new(
            kv.clone(),
            config.notifications.allowed,
        ));

        let records = RecordStore::new(kv.clone());
        let settings = SettingsStore::new(kv);
        let controller = ReminderController::new(
            records.clone(),
            settings.clone(),
            ReminderScheduler::new(outbox.clone()),
            Arc::new(SystemClock),
            Local,
        );

        Ok(Self {
            config,
            records,
            settings,
            outbox,
            reminders: ReminderService::spawn(controller),
        })
    }

    pub fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
