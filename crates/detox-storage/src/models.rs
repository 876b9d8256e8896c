use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time limit used until the user picks one
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 10;

/// User settings read by the monitoring loop at session start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    /// Continuous-usage threshold before the first reminder
    pub time_limit_minutes: u32,
    /// Application identifiers being monitored (bundle ids, package names, process names)
    pub watched_apps: Vec<String>,
    /// Whether monitoring was switched on; used to restart it after login
    pub monitoring_enabled: bool,
}

impl Settings {
    #[must_use]
    pub fn default_settings() -> Self {
        Self {
            id: Uuid::new_v4(),
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            watched_apps: Vec::new(),
            monitoring_enabled: false,
        }
    }

    /// Set the time limit, coercing zero to one minute
    pub fn set_time_limit(&mut self, minutes: u32) {
        self.time_limit_minutes = minutes.max(1);
    }

    /// Add an app to the watch list. Returns `false` if it was already there.
    pub fn watch_app(&mut self, app_id: &str) -> bool {
        let app_id = app_id.trim();
        if app_id.is_empty() || self.watched_apps.iter().any(|a| a == app_id) {
            return false;
        }
        self.watched_apps.push(app_id.to_string());
        self.watched_apps.sort();
        true
    }

    /// Remove an app from the watch list. Returns `false` if it was not watched.
    pub fn unwatch_app(&mut self, app_id: &str) -> bool {
        let before = self.watched_apps.len();
        self.watched_apps.retain(|a| a != app_id.trim());
        self.watched_apps.len() != before
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::default_settings()
    }
}
