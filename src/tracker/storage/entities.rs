use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::{rounded_seconds, to_log_timestamp};

/// Dwells shorter than this are noise and never reach the log.
pub const MIN_DWELL: Duration = Duration::seconds(1);

/// The document stored on disk: `{ "apps": [...] }`.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct ActivityLog {
    #[serde(default)]
    pub apps: Vec<ActivityRecord>,
}

/// Aggregated usage of a single window. Times are in seconds.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ActivityRecord {
    #[serde(rename = "app_name")]
    pub name: String,
    pub total_time_spent: f64,
    pub longest_session: f64,
    #[serde(with = "last_active_ser")]
    pub last_active: NaiveDateTime,
}

impl ActivityLog {
    pub fn find(&self, name: &str) -> Option<&ActivityRecord> {
        self.apps.iter().find(|v| v.name == name)
    }

    /// Merges a dwell into the aggregate for `name`. Returns the updated aggregate, or [None] if
    /// the dwell was ignored because it was too short or had no name.
    pub fn record_dwell(
        &mut self,
        name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Option<&ActivityRecord> {
        let duration = ended_at - started_at;
        if name.is_empty() || duration < MIN_DWELL {
            return None;
        }
        let seconds = rounded_seconds(duration);
        let last_active = to_log_timestamp(ended_at);

        let index = match self.apps.iter().position(|v| v.name == name) {
            Some(index) => {
                let record = &mut self.apps[index];
                record.total_time_spent = rounded_sum(record.total_time_spent, seconds);
                record.longest_session = record.longest_session.max(seconds);
                record.last_active = last_active;
                index
            }
            None => {
                self.apps.push(ActivityRecord {
                    name: name.to_string(),
                    total_time_spent: seconds,
                    longest_session: seconds,
                    last_active,
                });
                self.apps.len() - 1
            }
        };
        self.apps.get(index)
    }

    pub fn total_time(&self) -> f64 {
        self.apps.iter().map(|v| v.total_time_spent).sum()
    }
}

// Keeps the stored sums at 2 decimals instead of accumulating float noise.
fn rounded_sum(a: f64, b: f64) -> f64 {
    ((a + b) * 100.).round() / 100.
}

mod last_active_ser {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use crate::utils::time::LOG_TIMESTAMP_FORMAT;

    pub fn serialize<S>(moment: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&moment.format(LOG_TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, LOG_TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
