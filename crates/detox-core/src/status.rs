use serde::{Deserialize, Serialize};

use crate::session::{SessionEvent, SessionState};

pub const ACTIVE_TITLE: &str = "Social Detox Active";
pub const PAUSED_TITLE: &str = "Social Detox - Paused";

/// Text for the persistent status indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub title: String,
    pub text: String,
}

impl StatusUpdate {
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            title: ACTIVE_TITLE.to_string(),
            text: "Waiting for monitored app...".to_string(),
        }
    }

    #[must_use]
    pub fn counting(elapsed_seconds: u64) -> Self {
        Self {
            title: ACTIVE_TITLE.to_string(),
            text: format!("Uninterrupted time: {}", format_elapsed(elapsed_seconds)),
        }
    }

    #[must_use]
    pub fn paused(elapsed_seconds: u64, minimum_break_secs: u32) -> Self {
        Self {
            title: PAUSED_TITLE.to_string(),
            text: format!(
                "Timer paused at {}. Stay away for {minimum_break_secs}s to reset!",
                format_elapsed(elapsed_seconds)
            ),
        }
    }

    #[must_use]
    pub fn break_complete() -> Self {
        Self {
            title: ACTIVE_TITLE.to_string(),
            text: "Great! You took a real break. Timer reset. \u{1f389}".to_string(),
        }
    }

    /// Status text after a tick produced `event`.
    ///
    /// `Idle` returns `None`: whatever was shown last stays up.
    #[must_use]
    pub fn for_event(
        event: SessionEvent,
        session: &SessionState,
        minimum_break_secs: u32,
    ) -> Option<Self> {
        match event {
            SessionEvent::Continuing | SessionEvent::ThresholdCrossed => {
                Some(Self::counting(session.elapsed_seconds()))
            }
            SessionEvent::BreakStarted | SessionEvent::BreakAbandoned => {
                Some(Self::paused(session.elapsed_seconds(), minimum_break_secs))
            }
            SessionEvent::BreakConfirmed => Some(Self::break_complete()),
            SessionEvent::Idle => None,
        }
    }
}

/// Format seconds as `M:SS`
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
