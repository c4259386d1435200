use chrono::{DateTime, Utc};

use super::state::WindowIdentity;

/// Maximum number of warnings in a row before the tracker gives up on the user and ends the
/// session or streak.
pub const MAX_CONSECUTIVE_WARNINGS: u8 = 3;

const NOTIFICATION_TIMEOUT_SECONDS: u32 = 10;

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    RecordDwell {
        window: WindowIdentity,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
    Notify(Notice),
    /// Re-summarize the log. `present` also shows the result to the user.
    Analyze { present: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    FocusSessionStarted,
    /// `warning` counts from 1 up to [MAX_CONSECUTIVE_WARNINGS].
    FocusSessionEndWarning { warning: u8 },
    FocusSessionEnded,
    Nudge { title: String },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::FocusSessionStarted => "Focus session started",
            Notice::FocusSessionEndWarning { .. } => "Stay focused!",
            Notice::FocusSessionEnded => "Focus session ended",
            Notice::Nudge { .. } => "GET BACK TO WORK",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::FocusSessionStarted => {
                "You've been productive for a while. Distractions will now be called out.".into()
            }
            Notice::FocusSessionEndWarning { warning } => format!(
                "You're drifting away from your focus session (warning {warning} of {MAX_CONSECUTIVE_WARNINGS})."
            ),
            Notice::FocusSessionEnded => {
                "Your focus session ended after repeated distractions.".into()
            }
            Notice::Nudge { title } => format!("You are watching: {title}"),
        }
    }

    pub fn timeout_seconds(&self) -> u32 {
        NOTIFICATION_TIMEOUT_SECONDS
    }
}
