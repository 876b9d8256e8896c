use chrono::{DateTime, Utc};
use detox_storage::Settings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Seconds credited to the session for every tick spent in a watched app
pub const TICK_SECONDS: u64 = 1;

/// Break length that resets the session when no other value is configured
pub const DEFAULT_MINIMUM_BREAK_SECS: u32 = 30;

/// What happened to the usage session on a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A watched app is in front and time keeps counting
    Continuing,
    /// Continuous usage just reached the time limit for the first time this session
    ThresholdCrossed,
    /// The user left the watched apps; the break clock started
    BreakStarted,
    /// The break lasted long enough; elapsed time was reset to zero
    BreakConfirmed,
    /// Still away, but not long enough yet for the break to count
    BreakAbandoned,
    /// Nothing watched in front and nothing accumulated
    Idle,
}

impl SessionEvent {
    /// Get human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Continuing => "Counting",
            Self::ThresholdCrossed => "Limit reached",
            Self::BreakStarted => "Break started",
            Self::BreakConfirmed => "Break confirmed",
            Self::BreakAbandoned => "On break",
            Self::Idle => "Idle",
        }
    }
}

/// Time limit and watch list for one monitoring session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfiguration {
    time_limit_minutes: u32,
    watched_app_ids: HashSet<String>,
}

impl WatchConfiguration {
    /// Build a configuration. Limits below one minute are raised to one.
    #[must_use]
    pub fn new<I, S>(time_limit_minutes: i64, watched_app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            time_limit_minutes: u32::try_from(time_limit_minutes.max(1)).unwrap_or(u32::MAX),
            watched_app_ids: watched_app_ids.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            i64::from(settings.time_limit_minutes),
            settings.watched_apps.iter().cloned(),
        )
    }

    #[must_use]
    pub const fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> u64 {
        u64::from(self.time_limit_minutes) * 60
    }

    #[must_use]
    pub fn watched_app_ids(&self) -> &HashSet<String> {
        &self.watched_app_ids
    }

    /// Unknown foreground apps are never watched
    #[must_use]
    pub fn is_watched(&self, app_id: Option<&str>) -> bool {
        app_id.is_some_and(|id| self.watched_app_ids.contains(id))
    }
}

/// Continuous-usage state of the current session.
///
/// `elapsed_seconds` only ever grows by one tick or drops back to exactly zero.
/// `break_started_at` is set only while the user is away from the watched apps
/// after having used them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    elapsed_seconds: u64,
    limit_reached_this_session: bool,
    break_started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    #[must_use]
    pub const fn limit_reached_this_session(&self) -> bool {
        self.limit_reached_this_session
    }

    #[must_use]
    pub const fn break_started_at(&self) -> Option<DateTime<Utc>> {
        self.break_started_at
    }

    #[must_use]
    pub const fn is_on_break(&self) -> bool {
        self.break_started_at.is_some()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Counts continuous usage of watched apps, forgiving short interruptions
/// and resetting after real breaks.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    config: WatchConfiguration,
    state: SessionState,
}

impl SessionTracker {
    #[must_use]
    pub fn new(config: WatchConfiguration) -> Self {
        Self {
            config,
            state: SessionState::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &WatchConfiguration {
        &self.config
    }

    /// Advance the session by one polling interval.
    ///
    /// `now` must not go backwards between calls. A `minimum_break_secs` of
    /// zero is treated as one second.
    pub fn tick(
        &mut self,
        foreground_app_id: Option<&str>,
        minimum_break_secs: u32,
        now: DateTime<Utc>,
    ) -> SessionEvent {
        let minimum_break_secs = u64::from(minimum_break_secs.max(1));

        if self.config.is_watched(foreground_app_id) {
            if let Some(started) = self.state.break_started_at.take() {
                let away = seconds_between(started, now);
                if away >= minimum_break_secs {
                    log::info!("Break of {away}s confirmed on return, session reset");
                    self.state.reset();
                    return SessionEvent::BreakConfirmed;
                }
                log::debug!("Short break of {away}s forgiven");
            }

            self.state.elapsed_seconds = self.state.elapsed_seconds.saturating_add(TICK_SECONDS);

            if self.state.elapsed_seconds >= self.config.time_limit_seconds()
                && !self.state.limit_reached_this_session
            {
                self.state.limit_reached_this_session = true;
                return SessionEvent::ThresholdCrossed;
            }
            return SessionEvent::Continuing;
        }

        match self.state.break_started_at {
            None if self.state.elapsed_seconds > 0 => {
                self.state.break_started_at = Some(now);
                SessionEvent::BreakStarted
            }
            Some(started) => {
                let away = seconds_between(started, now);
                if away >= minimum_break_secs {
                    log::info!("Break of {away}s confirmed, session reset");
                    self.state.reset();
                    SessionEvent::BreakConfirmed
                } else {
                    SessionEvent::BreakAbandoned
                }
            }
            None => SessionEvent::Idle,
        }
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from(end.signed_duration_since(start).num_seconds()).unwrap_or(0)
}
