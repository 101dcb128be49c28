use serde::{Deserialize, Serialize};

/// Why a replan was requested.
///
/// Every trigger runs the same recompute-and-apply cycle; the kind is kept
/// for logging and for callers that report what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Trigger {
    DrinkLogged,
    SettingsChanged,
    /// The app came to the foreground or a process started.
    AppResumed,
    /// The daily replan trigger fired.
    DailyReplanFired,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::DrinkLogged => "drink-logged",
            Trigger::SettingsChanged => "settings-changed",
            Trigger::AppResumed => "app-resumed",
            Trigger::DailyReplanFired => "daily-replan-fired",
        }
    }
}
