use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};

use crate::tracker::classifier::Category;

/// A focused window as seen by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowObservation {
    pub title: Arc<str>,
    pub app_name: Arc<str>,
    pub observed_at: DateTime<Utc>,
}

impl WindowObservation {
    /// What the tracker sees when no window could be read.
    pub fn blank(observed_at: DateTime<Utc>) -> Self {
        Self {
            title: "".into(),
            app_name: "".into(),
            observed_at,
        }
    }

    pub fn identity(&self) -> WindowIdentity {
        WindowIdentity {
            title: self.title.clone(),
            app_name: self.app_name.clone(),
        }
    }
}

/// Identity of a window for switch detection. Two windows with the same title in different
/// applications are different windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowIdentity {
    pub title: Arc<str>,
    pub app_name: Arc<str>,
}

impl WindowIdentity {
    /// Name used as the key in the activity log: the title, or the application when the title is
    /// blank.
    pub fn record_name(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.app_name
        } else {
            &self.title
        }
    }
}

impl Display for WindowIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' ({})", self.title, self.app_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    Idle,
    AccumulatingProductive,
    InFocusSession,
    AccumulatingUnproductive,
}

/// Everything the state machine remembers between ticks. Created once per process.
///
/// At most one of the streak starts is set. `in_focus_session` is only ever set while
/// `productive_streak_start` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub last_window: Option<WindowIdentity>,
    pub dwell_start: DateTime<Utc>,
    pub current_category: Category,
    pub productive_streak_start: Option<DateTime<Utc>>,
    pub unproductive_streak_start: Option<DateTime<Utc>>,
    pub in_focus_session: bool,
    /// [None] until the first warning or nudge.
    pub last_nudge_at: Option<DateTime<Utc>>,
    pub last_analysis_at: DateTime<Utc>,
    pub consecutive_focus_warnings: u8,
    pub consecutive_nudge_warnings: u8,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_window: None,
            dwell_start: now,
            current_category: Category::Neutral,
            productive_streak_start: None,
            unproductive_streak_start: None,
            in_focus_session: false,
            last_nudge_at: None,
            last_analysis_at: now,
            consecutive_focus_warnings: 0,
            consecutive_nudge_warnings: 0,
        }
    }

    pub fn phase(&self) -> FocusPhase {
        if self.in_focus_session {
            FocusPhase::InFocusSession
        } else if self.productive_streak_start.is_some() {
            FocusPhase::AccumulatingProductive
        } else if self.unproductive_streak_start.is_some() {
            FocusPhase::AccumulatingUnproductive
        } else {
            FocusPhase::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{FocusPhase, SessionState, WindowIdentity, WindowObservation};

    #[test]
    fn test_record_name_falls_back_to_app() {
        let titled = WindowIdentity {
            title: "notes.md".into(),
            app_name: "editor".into(),
        };
        let untitled = WindowIdentity {
            title: "  ".into(),
            app_name: "editor".into(),
        };
        assert_eq!(titled.record_name(), "notes.md");
        assert_eq!(untitled.record_name(), "editor");
    }

    #[test]
    fn test_same_title_different_app() {
        let now = Utc::now();
        let a = WindowObservation {
            title: "Untitled".into(),
            app_name: "paint".into(),
            observed_at: now,
        };
        let b = WindowObservation {
            app_name: "notepad".into(),
            ..a.clone()
        };
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_initial_phase() {
        let state = SessionState::new(Utc::now());
        assert_eq!(state.phase(), FocusPhase::Idle);
        assert_eq!(WindowObservation::blank(state.dwell_start).identity().record_name(), "");
    }
}
