use chrono::{DateTime, Duration, Utc};

use super::state::SessionState;

/// Elapsed time readings derived from the timestamps in [SessionState].
impl SessionState {
    pub fn dwell_elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.dwell_start
    }

    pub fn productive_streak_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.productive_streak_start.map(|start| now - start)
    }

    pub fn unproductive_streak_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.unproductive_streak_start.map(|start| now - start)
    }

    /// Time since the last warning or nudge. [None] if there never was one.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_nudge_at.map(|last| now - last)
    }

    pub fn cooldown_ready(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.cooldown_elapsed(now).map_or(true, |v| v >= cooldown)
    }

    pub fn analysis_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.last_analysis_at >= interval
    }
}
