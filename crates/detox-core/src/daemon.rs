use crate::{
    config::socket_path,
    engine::{Engine, EngineConfig},
    ipc::{listen, DaemonIpcHandler},
    monitor::{create_monitor, ForegroundSource},
    notifier::{create_notifier, InterventionSink, StatusSink},
    scheduler::InterventionHistory,
    session::WatchConfiguration,
};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use detox_storage::Database;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Polls the foreground app once per tick and drives the engine.
///
/// The watch configuration is read once at construction; settings changes
/// take effect on the next start.
pub struct Daemon {
    database: Database,
    monitor: Box<dyn ForegroundSource>,
    notifier: Box<dyn InterventionSink>,
    engine: Engine,
    history: InterventionHistory,
    /// Set while the latest history has not reached the database
    history_unsaved: bool,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<AtomicBool>,
}

impl Daemon {
    /// Create a daemon with the platform foreground source and notifier
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported or settings cannot be read
    pub fn new(db: Database, config: EngineConfig) -> Result<Self> {
        Self::with_collaborators(db, create_monitor()?, create_notifier(), config)
    }

    /// Create a daemon with explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be read
    pub fn with_collaborators(
        db: Database,
        monitor: Box<dyn ForegroundSource>,
        notifier: Box<dyn InterventionSink>,
        config: EngineConfig,
    ) -> Result<Self> {
        let settings = db.get_settings()?;
        let watch = WatchConfiguration::from_settings(&settings);
        if watch.watched_app_ids().is_empty() {
            log::warn!("No watched apps configured, nothing will be counted");
        }
        log::info!(
            "Watching {} app(s) with a {} minute limit",
            watch.watched_app_ids().len(),
            watch.time_limit_minutes()
        );

        let history = match db.get_last_first_reminder_date() {
            Ok(last_first_reminder_date) => InterventionHistory {
                last_first_reminder_date,
            },
            Err(e) => {
                log::warn!("Failed to load intervention history: {e:#}");
                InterventionHistory::default()
            }
        };

        let shutdown_signal = Arc::new(AtomicBool::new(false));
        Ok(Self {
            database: db,
            monitor,
            notifier,
            engine: Engine::new(watch, config),
            history,
            history_unsaved: false,
            ipc_handler: Arc::new(DaemonIpcHandler::new(shutdown_signal.clone())),
            shutdown_signal,
        })
    }

    /// Run until Ctrl-C or an IPC shutdown request
    ///
    /// # Errors
    ///
    /// Returns an error if the socket path cannot be resolved or monitoring fails to start
    pub async fn run_with_signals(&mut self) -> Result<()> {
        let sock_path = socket_path()?;
        let ipc_handler = self.ipc_handler.clone();

        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        self.monitor.start_monitoring().await?;

        let mut interval = tick_interval(self.engine.config().tick_interval_secs);
        log::info!("Daemon started with signal handling and IPC");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        if let Err(e) = self.monitor.stop_monitoring().await {
            log::warn!("Failed to stop monitoring cleanly: {e:#}");
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    async fn tick(&mut self) {
        self.tick_at(Utc::now(), Local::now().date_naive()).await;
    }

    /// One tick. Collaborator failures are logged and never stop the loop.
    async fn tick_at(&mut self, now: DateTime<Utc>, today: NaiveDate) {
        let foreground = match self.monitor.foreground_app().await {
            Ok(app) => app,
            Err(e) => {
                log::warn!("Failed to read foreground app: {e:#}");
                None
            }
        };
        if let Some(app) = &foreground {
            log::debug!("Foreground app: {} ({})", app.app_name, app.app_id);
        }

        let history = self.load_history();
        let outcome = self.engine.step(
            foreground.as_ref().map(|app| app.app_id.as_str()),
            now,
            today,
            history,
        );
        log::debug!(
            "{} at {}s",
            outcome.event.description(),
            self.engine.session().elapsed_seconds()
        );

        self.history = outcome.history;
        if outcome.history != history || self.history_unsaved {
            self.save_history();
        }

        if let Some(intervention) = &outcome.intervention {
            log::info!("Presenting {:?}: {}", intervention.variant, intervention.title);
            if let Err(e) = self.notifier.present(intervention).await {
                log::warn!("Failed to present intervention: {e:#}");
            }
        }

        self.ipc_handler
            .set_session(foreground.map(|app| app.app_id), self.engine.session())
            .await;
        self.ipc_handler.update_status(&outcome.status).await;
    }

    /// Persisted history merged with the last known value; the later date wins
    fn load_history(&self) -> InterventionHistory {
        match self.database.get_last_first_reminder_date() {
            Ok(stored) => InterventionHistory {
                last_first_reminder_date: stored.max(self.history.last_first_reminder_date),
            },
            Err(e) => {
                log::warn!("Failed to read intervention history, using cached value: {e:#}");
                self.history
            }
        }
    }

    /// Write the cached history, retrying on later ticks after a failure
    fn save_history(&mut self) {
        match self
            .database
            .set_last_first_reminder_date(self.history.last_first_reminder_date)
        {
            Ok(()) => {
                if self.history_unsaved {
                    log::info!("Intervention history persisted after earlier failure");
                }
                self.history_unsaved = false;
            }
            Err(e) => {
                log::warn!("Failed to persist intervention history, will retry: {e:#}");
                self.history_unsaved = true;
            }
        }
    }
}

/// Poll timer for the daemon loop.
///
/// A slow poll must never turn into a burst of counted seconds, so missed
/// ticks are skipped.
fn tick_interval(secs: u64) -> Interval {
    let mut interval = interval(Duration::from_secs(secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ForegroundApp;
    use crate::scheduler::{Intervention, InterventionVariant};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const APP: &str = "firefox";

    struct FixedSource(Option<&'static str>);

    #[async_trait]
    impl ForegroundSource for FixedSource {
        async fn start_monitoring(&mut self) -> Result<()> {
            Ok(())
        }

        async fn foreground_app(&self) -> Result<Option<ForegroundApp>> {
            Ok(self.0.map(|id| ForegroundApp {
                app_id: id.to_string(),
                app_name: id.to_string(),
            }))
        }

        async fn stop_monitoring(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ForegroundSource for FailingSource {
        async fn start_monitoring(&mut self) -> Result<()> {
            Ok(())
        }

        async fn foreground_app(&self) -> Result<Option<ForegroundApp>> {
            anyhow::bail!("permission denied")
        }

        async fn stop_monitoring(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Intervention>>>);

    #[async_trait]
    impl InterventionSink for Recorder {
        async fn present(&self, intervention: &Intervention) -> Result<()> {
            self.0.lock().unwrap().push(intervention.clone());
            Ok(())
        }
    }

    fn database(dir: &tempfile::TempDir, limit: u32) -> Database {
        let db = Database::new(Some(dir.path().join("detox.db"))).unwrap();
        let mut settings = db.get_settings().unwrap();
        settings.set_time_limit(limit);
        settings.watch_app(APP);
        db.update_settings(&settings).unwrap();
        db
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 21, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    /// Run `n` one-second ticks starting `from` seconds after `t0`
    async fn run_ticks(daemon: &mut Daemon, from: i64, n: i64) {
        for i in from..from + n {
            daemon
                .tick_at(t0() + chrono::Duration::seconds(i), today())
                .await;
        }
    }

    #[tokio::test]
    async fn test_limit_persists_first_reminder_date() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let mut daemon = Daemon::with_collaborators(
            database(&dir, 1),
            Box::new(FixedSource(Some(APP))),
            Box::new(recorder.clone()),
            EngineConfig::default(),
        )
        .unwrap();

        run_ticks(&mut daemon, 0, 60).await;

        let shown = recorder.0.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].variant, InterventionVariant::FirstReminder);
        assert_eq!(
            daemon.database.get_last_first_reminder_date().unwrap(),
            Some(today())
        );
    }

    #[tokio::test]
    async fn test_persisted_history_demotes_first_reminder() {
        let dir = tempfile::tempdir().unwrap();
        let db = database(&dir, 1);
        db.set_last_first_reminder_date(Some(today())).unwrap();

        let recorder = Recorder::default();
        let mut daemon = Daemon::with_collaborators(
            db,
            Box::new(FixedSource(Some(APP))),
            Box::new(recorder.clone()),
            EngineConfig::default(),
        )
        .unwrap();

        run_ticks(&mut daemon, 0, 60).await;

        let shown = recorder.0.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].variant, InterventionVariant::Technique);
    }

    #[tokio::test]
    async fn test_failed_history_write_keeps_daily_cap() {
        let dir = tempfile::tempdir().unwrap();
        let db = database(&dir, 1);
        let blocker = rusqlite::Connection::open(dir.path().join("detox.db")).unwrap();
        blocker
            .execute_batch(
                "CREATE TRIGGER block_history BEFORE INSERT ON intervention_history
                 BEGIN SELECT RAISE(FAIL, 'disk full'); END;",
            )
            .unwrap();

        let recorder = Recorder::default();
        let mut daemon = Daemon::with_collaborators(
            db,
            Box::new(FixedSource(Some(APP))),
            Box::new(recorder.clone()),
            EngineConfig::default(),
        )
        .unwrap();

        // Limit, real break, limit again on the same day
        run_ticks(&mut daemon, 0, 60).await;
        daemon.monitor = Box::new(FixedSource(None));
        run_ticks(&mut daemon, 60, 31).await;
        daemon.monitor = Box::new(FixedSource(Some(APP)));
        run_ticks(&mut daemon, 91, 60).await;

        let variants: Vec<_> = recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.variant)
            .collect();
        assert_eq!(
            variants,
            vec![
                InterventionVariant::FirstReminder,
                InterventionVariant::Technique
            ]
        );
        assert_eq!(daemon.database.get_last_first_reminder_date().unwrap(), None);

        // Once writes work again the pending date is saved
        blocker.execute_batch("DROP TRIGGER block_history;").unwrap();
        run_ticks(&mut daemon, 151, 1).await;
        assert_eq!(
            daemon.database.get_last_first_reminder_date().unwrap(),
            Some(today())
        );
    }

    #[tokio::test]
    async fn test_tick_interval_skips_missed_ticks() {
        let interval = tick_interval(0);
        assert_eq!(interval.period(), Duration::from_secs(1));
        assert_eq!(interval.missed_tick_behavior(), MissedTickBehavior::Skip);
    }

    #[tokio::test]
    async fn test_foreground_failure_counts_as_unknown_app() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let mut daemon = Daemon::with_collaborators(
            database(&dir, 1),
            Box::new(FailingSource),
            Box::new(recorder.clone()),
            EngineConfig::default(),
        )
        .unwrap();

        run_ticks(&mut daemon, 0, 120).await;

        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(daemon.engine.session().elapsed_seconds(), 0);
        assert_eq!(daemon.database.get_last_first_reminder_date().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unwatched_app_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let mut daemon = Daemon::with_collaborators(
            database(&dir, 1),
            Box::new(FixedSource(Some("terminal"))),
            Box::new(recorder.clone()),
            EngineConfig::default(),
        )
        .unwrap();

        run_ticks(&mut daemon, 0, 90).await;
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(daemon.engine.session().elapsed_seconds(), 0);
    }
}
