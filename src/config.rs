//! User configuration stored in `config.json`.
//!
//! The configuration is loaded once at start-up and reloaded after every analysis, because the
//! analyzer suggests keywords for the user. Suggested keywords are merged into the stored lists and
//! written back, so they survive restarts.

use std::{collections::HashSet, path::Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    fs::operations::{read_json, write_json_atomically, JsonFile},
    utils::time::{seconds, std_seconds},
};

pub const DEFAULT_FOCUS_SESSION_START_SECONDS: f64 = 20.;
pub const DEFAULT_NUDGE_COOLDOWN_SECONDS: f64 = 20.;
pub const DEFAULT_MAX_UNPRODUCTIVE_SECONDS: f64 = 10.;
pub const DEFAULT_CHECK_INTERVAL_SECONDS: f64 = 0.5;
pub const DEFAULT_ANALYZE_INTERVAL_SECONDS: f64 = 300.;

const DEFAULT_PRODUCTIVE_KEYWORDS: [&str; 7] = [
    "code",
    "visual studio",
    "pycharm",
    "terminal",
    "document",
    "excel",
    "photoshop",
];

const DEFAULT_UNPRODUCTIVE_KEYWORDS: [&str; 6] = [
    "youtube",
    "facebook",
    "instagram",
    "twitter",
    "tiktok",
    "netflix",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Titles containing any of these are productive. Checked before the unproductive ones.
    #[serde(default)]
    pub productive_keywords: Vec<String>,
    #[serde(default)]
    pub unproductive_keywords: Vec<String>,
    /// Seconds of continuous productive work before a focus session starts.
    #[serde(default = "default_focus_session_start")]
    pub start_focus_session_in: f64,
    /// Minimal number of seconds between two warnings or nudges.
    #[serde(default = "default_nudge_cooldown")]
    pub nudge_cooldown: f64,
    /// Seconds of unproductive streak before the first nudge.
    #[serde(default = "default_max_unproductive")]
    pub max_unproductive_session_time: f64,
    /// Polling period of the tracker.
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,
    /// Period of background analysis. `null` disables it.
    #[serde(default = "default_analyze_interval")]
    pub analyze_interval: Option<f64>,
    #[serde(default = "default_analyze_on_exit")]
    pub analyze_on_exit: bool,
}

fn default_focus_session_start() -> f64 {
    DEFAULT_FOCUS_SESSION_START_SECONDS
}

fn default_nudge_cooldown() -> f64 {
    DEFAULT_NUDGE_COOLDOWN_SECONDS
}

fn default_max_unproductive() -> f64 {
    DEFAULT_MAX_UNPRODUCTIVE_SECONDS
}

fn default_check_interval() -> f64 {
    DEFAULT_CHECK_INTERVAL_SECONDS
}

fn default_analyze_interval() -> Option<f64> {
    Some(DEFAULT_ANALYZE_INTERVAL_SECONDS)
}

fn default_analyze_on_exit() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            productive_keywords: DEFAULT_PRODUCTIVE_KEYWORDS.map(String::from).to_vec(),
            unproductive_keywords: DEFAULT_UNPRODUCTIVE_KEYWORDS.map(String::from).to_vec(),
            start_focus_session_in: DEFAULT_FOCUS_SESSION_START_SECONDS,
            nudge_cooldown: DEFAULT_NUDGE_COOLDOWN_SECONDS,
            max_unproductive_session_time: DEFAULT_MAX_UNPRODUCTIVE_SECONDS,
            check_interval: DEFAULT_CHECK_INTERVAL_SECONDS,
            analyze_interval: Some(DEFAULT_ANALYZE_INTERVAL_SECONDS),
            analyze_on_exit: true,
        }
    }
}

impl Config {
    /// Loads the configuration and merges keywords learned by the analyzer into it.
    ///
    /// - A missing file is created with the defaults.
    /// - A corrupt file is left untouched and the defaults are used for this run.
    /// - Otherwise the merged configuration is written back.
    pub async fn load(config_path: &Path, summary_path: &Path) -> Result<Config> {
        let config = match read_json::<Config>(config_path).await? {
            JsonFile::Missing => {
                let config = Config::default();
                write_json_atomically(config_path, &config).await?;
                info!("Created default configuration in {config_path:?}");
                return Ok(config);
            }
            JsonFile::Corrupt(e) => {
                warn!("Configuration {config_path:?} is corrupt, falling back to defaults: {e}");
                let mut config = Config::default();
                config.merge_learned(&read_learned_keywords(summary_path).await);
                return Ok(config);
            }
            JsonFile::Loaded(config) => config,
        };

        let mut merged = config.clone();
        merged.merge_learned(&read_learned_keywords(summary_path).await);

        info!(
            "Loaded {} productive and {} unproductive keywords",
            merged.productive_keywords.len(),
            merged.unproductive_keywords.len()
        );

        if merged != config {
            write_json_atomically(config_path, &merged)
                .await
                .inspect_err(|e| warn!("Failed to save merged configuration {e:?}"))
                .ok();
        }
        Ok(merged)
    }

    /// Appends learned keywords and deduplicates both lists.
    pub fn merge_learned(&mut self, learned: &LearnedKeywords) {
        let productive = std::mem::take(&mut self.productive_keywords);
        self.productive_keywords =
            dedup_keywords(productive.into_iter().chain(learned.productive.iter().cloned()));
        let unproductive = std::mem::take(&mut self.unproductive_keywords);
        self.unproductive_keywords =
            dedup_keywords(unproductive.into_iter().chain(learned.unproductive.iter().cloned()));
    }

    pub fn focus_session_start(&self) -> chrono::Duration {
        seconds(self.start_focus_session_in)
    }

    pub fn nudge_cooldown(&self) -> chrono::Duration {
        seconds(self.nudge_cooldown)
    }

    pub fn max_unproductive_session(&self) -> chrono::Duration {
        seconds(self.max_unproductive_session_time)
    }

    /// Zero or negative intervals would make the loop spin, so they fall back to the default.
    pub fn check_interval(&self) -> std::time::Duration {
        if self.check_interval > 0. {
            std_seconds(self.check_interval)
        } else {
            std_seconds(DEFAULT_CHECK_INTERVAL_SECONDS)
        }
    }

    pub fn analyze_interval(&self) -> Option<chrono::Duration> {
        self.analyze_interval.filter(|v| *v > 0.).map(seconds)
    }
}

/// Keywords suggested by the analyzer in the summary document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LearnedKeywords {
    pub productive: Vec<String>,
    pub unproductive: Vec<String>,
}

impl LearnedKeywords {
    /// Lenient extraction: non-list values and non-string entries are ignored.
    pub fn from_summary(summary: &Value) -> Self {
        let strings = |key: &str| {
            summary
                .get(key)
                .and_then(Value::as_array)
                .map(|v| {
                    v.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        Self {
            productive: strings("productive_keywords"),
            unproductive: strings("unproductive_keywords"),
        }
    }
}

async fn read_learned_keywords(summary_path: &Path) -> LearnedKeywords {
    match read_json::<Value>(summary_path).await {
        Ok(JsonFile::Loaded(summary)) => LearnedKeywords::from_summary(&summary),
        Ok(JsonFile::Missing) => LearnedKeywords::default(),
        Ok(JsonFile::Corrupt(e)) => {
            warn!("Summary {summary_path:?} is corrupt, ignoring learned keywords: {e}");
            LearnedKeywords::default()
        }
        Err(e) => {
            warn!("Failed to read summary {summary_path:?}: {e:?}");
            LearnedKeywords::default()
        }
    }
}

/// Removes case-insensitive duplicates, keeping the first spelling and the original order.
pub fn dedup_keywords(keywords: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .filter(|keyword| seen.insert(keyword.to_lowercase()))
        .collect()
}
