//! Shape of the summary document produced by the analyzer. The document comes from a language
//! model, so every field is optional and falls back to an empty value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub summary: Totals,
    pub apps: Vec<AppSummary>,
    pub insights: Vec<String>,
    pub productive_keywords: Vec<String>,
    pub unproductive_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    pub total_time: f64,
    pub productive_time: f64,
    pub unproductive_time: f64,
    /// Percentage reported by the model. Missing when the model left it out.
    pub productivity_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSummary {
    pub app_name: String,
    pub productive: Usage,
    pub unproductive: Usage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub total_time_spent: f64,
    pub longest_session: f64,
    pub last_active: Option<String>,
}
