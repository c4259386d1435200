use std::{future::Future, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::fs::operations::{read_json, write_json_atomically, JsonFile};

use super::entities::{ActivityLog, ActivityRecord, MIN_DWELL};

/// Interface for abstracting storage of the activity log.
pub trait ActivityLogStore {
    /// Reads the whole log. Missing or corrupt storage gives an empty log.
    fn load_all(&self) -> impl Future<Output = Result<ActivityLog>>;

    /// Replaces the stored log with `log`.
    fn persist(&self, log: &ActivityLog) -> impl Future<Output = Result<()>>;

    /// Merges one dwell into the stored log and persists it right away. Dwells that are too short
    /// or have no name are skipped without touching storage.
    fn record_dwell(
        &self,
        name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<ActivityRecord>>> {
        async move {
            if name.is_empty() || ended_at - started_at < MIN_DWELL {
                return Ok(None);
            }
            let mut log = self.load_all().await?;
            let Some(record) = log.record_dwell(name, started_at, ended_at).cloned() else {
                return Ok(None);
            };
            self.persist(&log).await?;
            Ok(Some(record))
        }
    }
}

/// The main realization of [ActivityLogStore], a JSON document on disk.
pub struct JsonActivityLogStore {
    path: PathBuf,
}

impl JsonActivityLogStore {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Starts from an empty log.
    pub async fn reset(&self) -> Result<()> {
        self.persist(&ActivityLog::default()).await
    }
}

impl ActivityLogStore for JsonActivityLogStore {
    async fn load_all(&self) -> Result<ActivityLog> {
        match read_json::<ActivityLog>(&self.path).await? {
            JsonFile::Loaded(log) => Ok(log),
            JsonFile::Missing => {
                debug!("No activity log at {:?} yet", self.path);
                Ok(ActivityLog::default())
            }
            JsonFile::Corrupt(e) => {
                // Might happen after a crash during a write made by an older version.
                warn!("Activity log {:?} is corrupt, starting over: {e}", self.path);
                Ok(ActivityLog::default())
            }
        }
    }

    async fn persist(&self, log: &ActivityLog) -> Result<()> {
        write_json_atomically(&self.path, log).await
    }
}
