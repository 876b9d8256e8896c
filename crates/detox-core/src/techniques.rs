//! Fixed reminder texts: the first gentle reminder and the catalog of short
//! mindfulness techniques shown afterwards.

/// Title of the first reminder of the day
pub const FIRST_REMINDER_TITLE: &str = "Hey, just a gentle reminder \u{1f499}";

/// Title shared by every technique prompt
pub const TECHNIQUE_TITLE: &str = "Try this quick technique \u{2728}";

/// A short mindfulness prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Technique {
    pub subheading: &'static str,
    pub body: &'static str,
}

pub const TECHNIQUES: &[Technique] = &[
    Technique {
        subheading: "Box breathing",
        body: "Take a deep breath. Inhale for 4 seconds, hold for 4, exhale for 4.",
    },
    Technique {
        subheading: "Deep listening",
        body: "Listen deeply to the most silent sound you can hear around you.",
    },
    Technique {
        subheading: "Grounding",
        body: "Feel your feet on the ground. Notice the sensation for 10 seconds.",
    },
    Technique {
        subheading: "Colour hunt",
        body: "Look away from the screen. Find 3 things of the same color in your room.",
    },
    Technique {
        subheading: "Shoulder roll",
        body: "Roll your shoulders back slowly. Release the tension you're holding.",
    },
    Technique {
        subheading: "Be present",
        body: "Close your eyes for 10 seconds. Just be present with yourself.",
    },
    Technique {
        subheading: "Check in",
        body: "Ask yourself: What do I really need right now?",
    },
    Technique {
        subheading: "Gratitude",
        body: "Think of one person you're grateful for today.",
    },
    Technique {
        subheading: "Posture",
        body: "Notice your posture. Sit up straight and take a slow breath.",
    },
    Technique {
        subheading: "Heartbeat",
        body: "Put your hand on your heart. Feel it beating for a moment.",
    },
];

/// Body of the first reminder for the configured limit
#[must_use]
pub fn first_reminder_body(time_limit_minutes: u32) -> String {
    format!(
        "You've been on for {time_limit_minutes} minutes. Maybe a good moment for a break?"
    )
}
