use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::session::{SessionEvent, SessionState};
use crate::techniques::{first_reminder_body, FIRST_REMINDER_TITLE, TECHNIQUES, TECHNIQUE_TITLE};

/// Seconds between technique prompts once the limit has been passed
pub const DEFAULT_REPEAT_INTERVAL_SECS: u64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterventionVariant {
    /// The gentle reminder, shown at most once per calendar day
    FirstReminder,
    /// A mindfulness prompt from the technique catalog
    Technique,
}

/// A reminder to put in front of the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub variant: InterventionVariant,
    pub title: String,
    pub subheading: Option<String>,
    pub body: String,
}

impl Intervention {
    #[must_use]
    pub fn first_reminder(time_limit_minutes: u32) -> Self {
        Self {
            variant: InterventionVariant::FirstReminder,
            title: FIRST_REMINDER_TITLE.to_string(),
            subheading: None,
            body: first_reminder_body(time_limit_minutes),
        }
    }

    /// Technique at `index` in the catalog, wrapping around
    #[must_use]
    pub fn technique(index: usize) -> Self {
        let technique = TECHNIQUES[index % TECHNIQUES.len()];
        Self {
            variant: InterventionVariant::Technique,
            title: TECHNIQUE_TITLE.to_string(),
            subheading: Some(technique.subheading.to_string()),
            body: technique.body.to_string(),
        }
    }
}

/// Persisted record used to cap the first reminder to once per day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionHistory {
    pub last_first_reminder_date: Option<NaiveDate>,
}

impl InterventionHistory {
    #[must_use]
    pub fn first_reminder_shown_on(&self, day: NaiveDate) -> bool {
        self.last_first_reminder_date == Some(day)
    }
}

/// Chooses which technique to show. Closures `FnMut(usize) -> usize` work too.
pub trait TechniquePicker: Send {
    /// Return an index in `0..catalog_len`
    fn pick(&mut self, catalog_len: usize) -> usize;
}

impl<F> TechniquePicker for F
where
    F: FnMut(usize) -> usize + Send,
{
    fn pick(&mut self, catalog_len: usize) -> usize {
        self(catalog_len)
    }
}

/// Uniform random choice with replacement
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TechniquePicker for RandomPicker {
    fn pick(&mut self, catalog_len: usize) -> usize {
        self.rng.gen_range(0..catalog_len.max(1))
    }
}

/// Decides which reminder, if any, a tick produces.
///
/// Apart from the persisted history the scheduler keeps no state between
/// ticks: periodic prompts are derived from the session's elapsed time.
pub struct InterventionScheduler {
    time_limit_minutes: u32,
    repeat_interval_secs: u64,
    picker: Box<dyn TechniquePicker>,
}

impl InterventionScheduler {
    /// Create a scheduler with random technique selection.
    /// Zero values are raised to one.
    #[must_use]
    pub fn new(time_limit_minutes: u32, repeat_interval_secs: u64) -> Self {
        Self {
            time_limit_minutes: time_limit_minutes.max(1),
            repeat_interval_secs: repeat_interval_secs.max(1),
            picker: Box::new(RandomPicker::new()),
        }
    }

    /// Replace the technique picker
    #[must_use]
    pub fn with_picker(mut self, picker: impl TechniquePicker + 'static) -> Self {
        self.picker = Box::new(picker);
        self
    }

    #[must_use]
    pub const fn repeat_interval_secs(&self) -> u64 {
        self.repeat_interval_secs
    }

    /// Decide on this tick's intervention and return the updated history.
    pub fn decide(
        &mut self,
        event: SessionEvent,
        session: &SessionState,
        today: NaiveDate,
        history: InterventionHistory,
    ) -> (Option<Intervention>, InterventionHistory) {
        match event {
            SessionEvent::ThresholdCrossed => {
                if history.first_reminder_shown_on(today) {
                    // Already reminded today: demote to a technique
                    (Some(self.next_technique()), history)
                } else {
                    let updated = InterventionHistory {
                        last_first_reminder_date: Some(today),
                    };
                    (
                        Some(Intervention::first_reminder(self.time_limit_minutes)),
                        updated,
                    )
                }
            }
            SessionEvent::Continuing if session.limit_reached_this_session() => {
                if self.is_repeat_boundary(session.elapsed_seconds()) {
                    (Some(self.next_technique()), history)
                } else {
                    (None, history)
                }
            }
            SessionEvent::Continuing
            | SessionEvent::BreakStarted
            | SessionEvent::BreakConfirmed
            | SessionEvent::BreakAbandoned
            | SessionEvent::Idle => (None, history),
        }
    }

    fn is_repeat_boundary(&self, elapsed_seconds: u64) -> bool {
        let limit_secs = u64::from(self.time_limit_minutes) * 60;
        let overage = elapsed_seconds.saturating_sub(limit_secs);
        overage > 0 && overage % self.repeat_interval_secs == 0
    }

    fn next_technique(&mut self) -> Intervention {
        let index = self.picker.pick(TECHNIQUES.len());
        Intervention::technique(index)
    }
}
