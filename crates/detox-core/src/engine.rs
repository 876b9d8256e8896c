use chrono::{DateTime, NaiveDate, Utc};

use crate::scheduler::{
    Intervention, InterventionHistory, InterventionScheduler, TechniquePicker,
    DEFAULT_REPEAT_INTERVAL_SECS,
};
use crate::session::{
    SessionEvent, SessionState, SessionTracker, WatchConfiguration, DEFAULT_MINIMUM_BREAK_SECS,
};
use crate::status::StatusUpdate;

/// Timing constants for a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How often the driving loop polls the foreground app
    pub tick_interval_secs: u64,
    /// Away time after which a break resets the session
    pub minimum_break_secs: u32,
    /// Seconds between technique prompts after the limit
    pub repeat_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            minimum_break_secs: DEFAULT_MINIMUM_BREAK_SECS,
            repeat_interval_secs: DEFAULT_REPEAT_INTERVAL_SECS,
        }
    }
}

/// Everything a single tick produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub event: SessionEvent,
    pub intervention: Option<Intervention>,
    pub history: InterventionHistory,
    pub status: StatusUpdate,
}

/// Runs the session tracker and the intervention scheduler in lockstep.
///
/// Owned by exactly one driving loop; nothing here synchronizes.
pub struct Engine {
    tracker: SessionTracker,
    scheduler: InterventionScheduler,
    config: EngineConfig,
    status: StatusUpdate,
}

impl Engine {
    #[must_use]
    pub fn new(watch: WatchConfiguration, config: EngineConfig) -> Self {
        let scheduler =
            InterventionScheduler::new(watch.time_limit_minutes(), config.repeat_interval_secs);
        Self {
            tracker: SessionTracker::new(watch),
            scheduler,
            config,
            status: StatusUpdate::waiting(),
        }
    }

    /// Replace the technique picker
    #[must_use]
    pub fn with_picker(mut self, picker: impl TechniquePicker + 'static) -> Self {
        self.scheduler = self.scheduler.with_picker(picker);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        self.tracker.state()
    }

    #[must_use]
    pub const fn watch_configuration(&self) -> &WatchConfiguration {
        self.tracker.config()
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feed one foreground observation through tracker and scheduler
    pub fn step(
        &mut self,
        foreground_app_id: Option<&str>,
        now: DateTime<Utc>,
        today: NaiveDate,
        history: InterventionHistory,
    ) -> TickOutcome {
        let event = self
            .tracker
            .tick(foreground_app_id, self.config.minimum_break_secs, now);
        let (intervention, history) =
            self.scheduler.decide(event, self.tracker.state(), today, history);
        if let Some(status) =
            StatusUpdate::for_event(event, self.tracker.state(), self.config.minimum_break_secs)
        {
            self.status = status;
        }

        TickOutcome {
            event,
            intervention,
            history,
            status: self.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::InterventionVariant;
    use chrono::{Duration, TimeZone};

    const APP: &str = "com.instagram.android";
    const OTHER: &str = "org.mozilla.firefox";

    struct Clock {
        now: DateTime<Utc>,
        today: NaiveDate,
        history: InterventionHistory,
    }

    impl Clock {
        fn new() -> Self {
            Self {
                now: Utc.with_ymd_and_hms(2024, 2, 10, 20, 0, 0).unwrap(),
                today: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                history: InterventionHistory::default(),
            }
        }

        fn step(&mut self, engine: &mut Engine, app: Option<&str>) -> TickOutcome {
            let outcome = engine.step(app, self.now, self.today, self.history);
            self.history = outcome.history;
            self.now += Duration::seconds(1);
            outcome
        }

        fn run(&mut self, engine: &mut Engine, app: Option<&str>, n: usize) -> Vec<TickOutcome> {
            (0..n).map(|_| self.step(engine, app)).collect()
        }
    }

    fn engine(limit_minutes: i64) -> Engine {
        Engine::new(
            WatchConfiguration::new(limit_minutes, [APP]),
            EngineConfig::default(),
        )
        .with_picker(|_: usize| 0_usize)
    }

    fn interventions(outcomes: &[TickOutcome]) -> Vec<InterventionVariant> {
        outcomes
            .iter()
            .filter_map(|o| o.intervention.as_ref().map(|i| i.variant))
            .collect()
    }

    #[test]
    fn test_reference_scenario() {
        let mut engine = engine(1);
        let mut clock = Clock::new();

        let outcomes = clock.run(&mut engine, Some(APP), 60);
        let last = outcomes.last().unwrap();
        assert_eq!(last.event, SessionEvent::ThresholdCrossed);
        assert_eq!(
            last.intervention.as_ref().map(|i| i.variant),
            Some(InterventionVariant::FirstReminder)
        );
        assert_eq!(interventions(&outcomes).len(), 1);
        assert_eq!(clock.history.last_first_reminder_date, Some(clock.today));

        // Glance at another app for 10 seconds
        let outcomes = clock.run(&mut engine, Some(OTHER), 10);
        assert_eq!(engine.session().elapsed_seconds(), 60);
        assert_eq!(
            outcomes[0].status.text,
            "Timer paused at 1:00. Stay away for 30s to reset!"
        );
        clock.step(&mut engine, Some(APP));
        assert_eq!(engine.session().elapsed_seconds(), 61);

        // Real break
        let outcomes = clock.run(&mut engine, Some(OTHER), 31);
        assert_eq!(outcomes[30].event, SessionEvent::BreakConfirmed);
        assert_eq!(outcomes[30].status, StatusUpdate::break_complete());
        assert_eq!(engine.session().elapsed_seconds(), 0);
        assert!(!engine.session().limit_reached_this_session());
    }

    #[test]
    fn test_break_message_stays_while_idle() {
        let mut engine = engine(1);
        let mut clock = Clock::new();
        clock.run(&mut engine, Some(APP), 10);

        let outcomes = clock.run(&mut engine, None, 40);
        assert_eq!(outcomes[30].event, SessionEvent::BreakConfirmed);
        for outcome in &outcomes[31..] {
            assert_eq!(outcome.event, SessionEvent::Idle);
            assert_eq!(outcome.status, StatusUpdate::break_complete());
        }

        // Counting again replaces it
        let outcome = clock.step(&mut engine, Some(APP));
        assert_eq!(outcome.status, StatusUpdate::counting(1));
    }

    #[test]
    fn test_technique_after_repeat_interval() {
        let mut engine = engine(1);
        let mut clock = Clock::new();
        clock.run(&mut engine, Some(APP), 60);

        let outcomes = clock.run(&mut engine, Some(APP), 180);
        // Ticks 61..=239 are silent, tick 240 prompts
        assert!(outcomes[..179].iter().all(|o| o.intervention.is_none()));
        assert_eq!(engine.session().elapsed_seconds(), 240);
        assert_eq!(
            outcomes[179].intervention.as_ref().map(|i| i.variant),
            Some(InterventionVariant::Technique)
        );
    }

    #[test]
    fn test_daily_cap_across_sessions() {
        let mut engine = engine(1);
        let mut clock = Clock::new();

        let mut variants = Vec::new();
        for _ in 0..3 {
            variants.extend(interventions(&clock.run(&mut engine, Some(APP), 60)));
            clock.run(&mut engine, None, 31);
        }

        assert_eq!(
            variants,
            vec![
                InterventionVariant::FirstReminder,
                InterventionVariant::Technique,
                InterventionVariant::Technique,
            ]
        );
    }

    #[test]
    fn test_first_reminder_returns_next_day() {
        let mut engine = engine(1);
        let mut clock = Clock::new();
        clock.run(&mut engine, Some(APP), 60);
        clock.run(&mut engine, None, 31);

        clock.today = clock.today.succ_opt().unwrap();
        let outcomes = clock.run(&mut engine, Some(APP), 60);
        assert_eq!(
            interventions(&outcomes),
            vec![InterventionVariant::FirstReminder]
        );
        assert_eq!(clock.history.last_first_reminder_date, Some(clock.today));
    }

    #[test]
    fn test_never_watched_never_intervenes() {
        let mut engine = engine(1);
        let mut clock = Clock::new();
        let outcomes = clock.run(&mut engine, Some(OTHER), 1000);
        assert!(outcomes.iter().all(|o| o.event == SessionEvent::Idle));
        assert!(outcomes.iter().all(|o| o.status == StatusUpdate::waiting()));
        assert!(interventions(&outcomes).is_empty());
        assert_eq!(engine.session().elapsed_seconds(), 0);
    }

    #[test]
    fn test_threshold_precedes_any_technique() {
        let mut engine = engine(2);
        let mut clock = Clock::new();
        let mut outcomes = clock.run(&mut engine, Some(APP), 100);
        outcomes.extend(clock.run(&mut engine, None, 12));
        outcomes.extend(clock.run(&mut engine, Some(APP), 500));

        let first_technique = outcomes.iter().position(|o| {
            o.intervention
                .as_ref()
                .is_some_and(|i| i.variant == InterventionVariant::Technique)
        });
        let crossing = outcomes
            .iter()
            .position(|o| o.event == SessionEvent::ThresholdCrossed);
        assert!(crossing.unwrap() < first_technique.unwrap());
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| o.event == SessionEvent::ThresholdCrossed)
                .count(),
            1
        );
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval_secs, 1);
        assert_eq!(config.minimum_break_secs, 30);
        assert_eq!(config.repeat_interval_secs, 180);
    }
}
