mod config;
pub mod database;
pub mod memory;
pub mod records;
pub mod settings;

pub use config::Config;
pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use records::{DrinkRecord, RecordStore};
pub use settings::{
    QuickAddOption, SettingsStore, DEFAULT_DAILY_GOAL_ML, DEFAULT_QUICK_ADD_OPTIONS,
    DEFAULT_REMINDER_SETTINGS,
};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PortError;

/// Logical keys under which the stores persist their values.
pub mod keys {
    pub const DAILY_GOAL: &str = "daily_goal";
    pub const WATER_RECORDS: &str = "water_records";
    pub const QUICK_ADD_OPTIONS: &str = "quick_add_options";
    pub const NOTIFICATION_SETTINGS: &str = "notification_settings";
    pub const PENDING_REMINDERS: &str = "pending_reminders";
    pub const NOTIFICATION_INBOX: &str = "notification_inbox";
}

/// Persistence port: a string key-value store.
///
/// Values are JSON documents; the stores above this trait own the encoding.
/// Implementations must make a `set` visible to the next `get` on the same key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PortError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PortError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PortError>;

    /// Read-modify-write of one key, atomic against every other writer.
    ///
    /// `apply` receives the current value and returns the new one; `None`
    /// removes the key. When `apply` fails nothing is written.
    async fn update(
        &self,
        key: &str,
        apply: &mut (dyn FnMut(Option<String>) -> Result<Option<String>, PortError> + Send),
    ) -> Result<(), PortError>;
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PortError> {
    match kv.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PortError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

pub(crate) async fn write_json<T: serde::Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PortError> {
    let raw = serde_json::to_string(value).map_err(|e| PortError::WriteFailed {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    kv.set(key, &raw).await
}

/// Atomically edit the JSON document under `key` in place.
///
/// A missing key starts from `T::default()`. Returns whatever `edit` returns.
pub(crate) async fn update_json<T, R, F>(
    kv: &dyn KeyValueStore,
    key: &str,
    edit: F,
) -> Result<R, PortError>
where
    T: serde::de::DeserializeOwned + serde::Serialize + Default,
    R: Send,
    F: FnOnce(&mut T) -> R + Send,
{
    let mut edit = Some(edit);
    let mut output = None;
    kv.update(key, &mut |raw| {
        let mut value: T = match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| PortError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?,
            None => T::default(),
        };
        if let Some(edit) = edit.take() {
            output = Some(edit(&mut value));
        }
        serde_json::to_string(&value)
            .map(Some)
            .map_err(|e| PortError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    })
    .await?;

    output.ok_or_else(|| PortError::WriteFailed {
        key: key.to_string(),
        message: "store did not run the update".into(),
    })
}

/// Returns the Hydrate data directory, creating it if needed.
///
/// `HYDRATE_DATA_DIR` wins when set. Otherwise `~/.config/hydrate`, or
/// `~/.config/hydrate-dev` with `HYDRATE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("HYDRATE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HYDRATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("hydrate-dev")
            } else {
                base_dir.join("hydrate")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
