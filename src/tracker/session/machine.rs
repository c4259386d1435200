use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::{config::Config, tracker::classifier::Category};

use super::{
    intent::{Intent, Notice, MAX_CONSECUTIVE_WARNINGS},
    state::{SessionState, WindowIdentity, WindowObservation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub focus_session_start: Duration,
    pub nudge_cooldown: Duration,
    pub max_unproductive_session: Duration,
    pub analyze_interval: Option<Duration>,
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            focus_session_start: config.focus_session_start(),
            nudge_cooldown: config.nudge_cooldown(),
            max_unproductive_session: config.max_unproductive_session(),
            analyze_interval: config.analyze_interval(),
        }
    }
}

/// Decides, once per tick, what happened since the previous tick and what should be done about
/// it. It never performs side effects itself.
#[derive(Debug, Clone)]
pub struct FocusStateMachine {
    thresholds: Thresholds,
}

impl FocusStateMachine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Processes one observation that was classified as `category`.
    pub fn tick(
        &self,
        state: &mut SessionState,
        observation: &WindowObservation,
        category: Category,
    ) -> Vec<Intent> {
        let now = observation.observed_at;
        let window = observation.identity();
        let mut intents = Vec::new();

        match &state.last_window {
            Some(previous) if *previous != window => {
                debug!("Switched from {previous} to {window}");
                intents.push(Intent::RecordDwell {
                    window: previous.clone(),
                    started_at: state.dwell_start,
                    ended_at: now,
                });
                state.dwell_start = now;
                state.last_window = Some(window.clone());
            }
            Some(_) => {}
            None => {
                state.dwell_start = now;
                state.last_window = Some(window.clone());
            }
        }
        state.current_category = category;

        if category == Category::Productive {
            self.on_productive(state, now, &mut intents);
        } else {
            self.on_distraction(state, &window, category, now, &mut intents);
        }

        // Periodic analyses see the log up to the last switch. Splitting the open dwell here would
        // cut its longest session short.
        if let Some(interval) = self.thresholds.analyze_interval {
            let already_requested = intents.iter().any(|v| matches!(v, Intent::Analyze { .. }));
            if !already_requested && state.analysis_due(now, interval) {
                intents.push(Intent::Analyze { present: false });
            }
        }
        if intents.iter().any(|v| matches!(v, Intent::Analyze { .. })) {
            state.last_analysis_at = now;
        }

        intents
    }

    /// Final flush for the window that is still focused when the tracker stops.
    pub fn shutdown(&self, state: &mut SessionState, now: DateTime<Utc>) -> Vec<Intent> {
        match state.last_window.clone() {
            Some(window) => {
                let mut intents = Vec::new();
                close_dwell(state, window, now, &mut intents);
                intents
            }
            None => vec![],
        }
    }

    fn on_productive(&self, state: &mut SessionState, now: DateTime<Utc>, intents: &mut Vec<Intent>) {
        if state.productive_streak_start.is_none() {
            state.productive_streak_start = Some(now);
            state.unproductive_streak_start = None;
            state.consecutive_nudge_warnings = 0;
            return;
        }

        if state.in_focus_session {
            state.consecutive_focus_warnings = 0;
            return;
        }

        let reached = state
            .productive_streak_elapsed(now)
            .is_some_and(|v| v >= self.thresholds.focus_session_start);
        if reached {
            info!("Focus session started");
            state.in_focus_session = true;
            intents.push(Intent::Notify(Notice::FocusSessionStarted));
        }
    }

    fn on_distraction(
        &self,
        state: &mut SessionState,
        window: &WindowIdentity,
        category: Category,
        now: DateTime<Utc>,
        intents: &mut Vec<Intent>,
    ) {
        if state.in_focus_session {
            self.warn_focus_session(state, window, now, intents);
        } else {
            state.productive_streak_start = None;
        }

        // Evaluated after the focus session branch, so a tick that ends a session can already
        // start an unproductive streak.
        if state.in_focus_session {
            return;
        }
        match category {
            Category::Unproductive => self.track_unproductive(state, window, now, intents),
            Category::Neutral => state.unproductive_streak_start = None,
            Category::Productive => {}
        }
    }

    fn warn_focus_session(
        &self,
        state: &mut SessionState,
        window: &WindowIdentity,
        now: DateTime<Utc>,
        intents: &mut Vec<Intent>,
    ) {
        if !state.cooldown_ready(now, self.thresholds.nudge_cooldown) {
            return;
        }

        if state.consecutive_focus_warnings < MAX_CONSECUTIVE_WARNINGS {
            state.consecutive_focus_warnings += 1;
            debug!("Focus session warning {}", state.consecutive_focus_warnings);
            intents.push(Intent::Notify(Notice::FocusSessionEndWarning {
                warning: state.consecutive_focus_warnings,
            }));
        } else {
            info!("Focus session ended due to unproductive activity");
            state.in_focus_session = false;
            state.productive_streak_start = None;
            state.consecutive_focus_warnings = 0;
            intents.push(Intent::Notify(Notice::FocusSessionEnded));
            close_dwell(state, window.clone(), now, intents);
            intents.push(Intent::Analyze { present: true });
        }
        state.last_nudge_at = Some(now);
    }

    fn track_unproductive(
        &self,
        state: &mut SessionState,
        window: &WindowIdentity,
        now: DateTime<Utc>,
        intents: &mut Vec<Intent>,
    ) {
        if state.unproductive_streak_start.is_none() {
            state.unproductive_streak_start = Some(now);
            return;
        }

        let overdue = state
            .unproductive_streak_elapsed(now)
            .is_some_and(|v| v >= self.thresholds.max_unproductive_session);
        if !overdue || !state.cooldown_ready(now, self.thresholds.nudge_cooldown) {
            return;
        }

        if state.consecutive_nudge_warnings < MAX_CONSECUTIVE_WARNINGS {
            state.consecutive_nudge_warnings += 1;
            state.last_nudge_at = Some(now);
            debug!("Nudge {}", state.consecutive_nudge_warnings);
            intents.push(Intent::Notify(Notice::Nudge {
                title: window.record_name().to_string(),
            }));
        } else {
            info!("Unproductive streak ended after ignored nudges");
            state.consecutive_nudge_warnings = 0;
            state.unproductive_streak_start = None;
            close_dwell(state, window.clone(), now, intents);
            intents.push(Intent::Analyze { present: true });
        }
    }
}

/// Records the current dwell up to `now` and starts a new one, so the same time is never
/// recorded twice.
fn close_dwell(
    state: &mut SessionState,
    window: WindowIdentity,
    now: DateTime<Utc>,
    intents: &mut Vec<Intent>,
) {
    intents.push(Intent::RecordDwell {
        window,
        started_at: state.dwell_start,
        ended_at: now,
    });
    state.dwell_start = now;
}
