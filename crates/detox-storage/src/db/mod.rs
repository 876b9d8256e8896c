//! SQLite persistence for settings and the intervention history.

mod helpers;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

use crate::migrations;
use crate::models::Settings;

use helpers::{parse_date, parse_uuid, DATE_FORMAT};

const HISTORY_KEY: &str = "first_reminder";

/// Database connection wrapper
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if database directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;

        log::debug!("Database initialized at: {}", path.display());

        Ok(Self { conn })
    }

    /// Get default database path
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("detox");
        path.push("detox.db");
        path
    }

    // ==================== Settings Methods ====================

    /// Get or create settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or insert operation fails
    pub fn get_settings(&self) -> Result<Settings> {
        let result: Option<Settings> = self
            .conn
            .query_row(
                "SELECT id, time_limit_minutes, watched_apps, monitoring_enabled
                 FROM settings LIMIT 1",
                [],
                |row| {
                    let watched_apps_json: String = row.get(2)?;
                    let watched_apps: Vec<String> =
                        serde_json::from_str(&watched_apps_json).unwrap_or_default();
                    let time_limit: i64 = row.get(1)?;

                    Ok(Settings {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        time_limit_minutes: u32::try_from(time_limit.max(1))
                            .unwrap_or(u32::MAX),
                        watched_apps,
                        monitoring_enabled: row.get::<_, Option<i32>>(3)?.unwrap_or(0) != 0,
                    })
                },
            )
            .optional()?;

        if let Some(settings) = result {
            Ok(settings)
        } else {
            // Create default settings
            let settings = Settings::default_settings();
            self.update_settings(&settings)?;
            Ok(settings)
        }
    }

    /// Update settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database update operation or JSON serialization fails
    pub fn update_settings(&self, settings: &Settings) -> Result<()> {
        let watched_apps_json = serde_json::to_string(&settings.watched_apps)?;

        self.conn.execute(
            "INSERT INTO settings (id, time_limit_minutes, watched_apps, monitoring_enabled)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                time_limit_minutes = ?2,
                watched_apps = ?3,
                monitoring_enabled = ?4",
            params![
                settings.id.to_string(),
                settings.time_limit_minutes.max(1),
                watched_apps_json,
                i32::from(settings.monitoring_enabled),
            ],
        )?;
        Ok(())
    }

    // ==================== Intervention History Methods ====================

    /// Date the first-reminder intervention was last shown, if ever
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored date is corrupted
    pub fn get_last_first_reminder_date(&self) -> Result<Option<NaiveDate>> {
        let stored: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT last_first_reminder_date FROM intervention_history WHERE key = ?1",
                params![HISTORY_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stored.flatten() {
            Some(s) => Ok(Some(parse_date(&s)?)),
            None => Ok(None),
        }
    }

    /// Record the date the first-reminder intervention was shown
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails
    pub fn set_last_first_reminder_date(&self, date: Option<NaiveDate>) -> Result<()> {
        let value = date.map(|d| d.format(DATE_FORMAT).to_string());
        self.conn.execute(
            "INSERT INTO intervention_history (key, last_first_reminder_date)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET last_first_reminder_date = ?2",
            params![HISTORY_KEY, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::new(Some(dir.path().join("detox.db"))).unwrap();
        (db, dir)
    }

    #[test]
    fn test_get_settings_creates_defaults() {
        let (db, _dir) = setup();
        let settings = db.get_settings().unwrap();
        assert_eq!(settings.time_limit_minutes, 10);
        assert!(settings.watched_apps.is_empty());

        // Second read returns the same row
        let again = db.get_settings().unwrap();
        assert_eq!(settings.id, again.id);
    }

    #[test]
    fn test_update_settings_round_trip() {
        let (db, _dir) = setup();
        let mut settings = db.get_settings().unwrap();
        settings.set_time_limit(15);
        settings.watch_app("com.twitter.android");
        settings.monitoring_enabled = true;
        db.update_settings(&settings).unwrap();

        let loaded = db.get_settings().unwrap();
        assert_eq!(loaded.time_limit_minutes, 15);
        assert_eq!(loaded.watched_apps, vec!["com.twitter.android"]);
        assert!(loaded.monitoring_enabled);
    }

    #[test]
    fn test_settings_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("detox.db");
        {
            let db = Database::new(Some(path.clone())).unwrap();
            let mut settings = db.get_settings().unwrap();
            settings.set_time_limit(3);
            db.update_settings(&settings).unwrap();
        }
        let db = Database::new(Some(path)).unwrap();
        assert_eq!(db.get_settings().unwrap().time_limit_minutes, 3);
    }

    #[test]
    fn test_first_reminder_date_defaults_to_none() {
        let (db, _dir) = setup();
        assert_eq!(db.get_last_first_reminder_date().unwrap(), None);
    }

    #[test]
    fn test_first_reminder_date_round_trip() {
        let (db, _dir) = setup();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        db.set_last_first_reminder_date(Some(day)).unwrap();
        assert_eq!(db.get_last_first_reminder_date().unwrap(), Some(day));

        let next = day.succ_opt().unwrap();
        db.set_last_first_reminder_date(Some(next)).unwrap();
        assert_eq!(db.get_last_first_reminder_date().unwrap(), Some(next));

        db.set_last_first_reminder_date(None).unwrap();
        assert_eq!(db.get_last_first_reminder_date().unwrap(), None);
    }
}
