use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Productive,
    Unproductive,
    #[default]
    Neutral,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Productive => write!(f, "productive"),
            Category::Unproductive => write!(f, "unproductive"),
            Category::Neutral => write!(f, "neutral"),
        }
    }
}

/// Keyword based classification of window titles. Keywords are stored lower-cased, matching is a
/// case-insensitive substring test.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    productive: Vec<String>,
    unproductive: Vec<String>,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(productive: &[S], unproductive: &[S]) -> Self {
        Self {
            productive: normalize(productive),
            unproductive: normalize(unproductive),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.productive_keywords.as_slice(),
            config.unproductive_keywords.as_slice(),
        )
    }

    /// Productive keywords win when a title matches both lists.
    pub fn classify(&self, title: &str) -> Category {
        if title.trim().is_empty() {
            return Category::Neutral;
        }
        let title = title.to_lowercase();
        if self.productive.iter().any(|v| title.contains(v.as_str())) {
            Category::Productive
        } else if self.unproductive.iter().any(|v| title.contains(v.as_str())) {
            Category::Unproductive
        } else {
            Category::Neutral
        }
    }
}

// An empty keyword would match every title.
fn normalize<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    keywords
        .iter()
        .map(|v| v.as_ref().trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
