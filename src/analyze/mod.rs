//! Re-summarization of the activity log by a remote language model.
//!
//! The analyzer reads the activity log, asks the model for a categorized summary and stores the
//! reply as the summary document. A failed or malformed reply never replaces an existing summary.

pub mod gemini;
pub mod prompt;

use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::fs::operations::write_json_atomically;

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Summarizes the log at `log_path` into the document at `summary_path`.
    async fn analyze(&self, log_path: &Path, summary_path: &Path) -> Result<()>;
}

/// Models like to wrap JSON into a Markdown code block even when asked not to.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut value = raw.trim();
    if let Some(rest) = value.strip_prefix("```") {
        value = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = value.strip_suffix("```") {
        value = rest;
    }
    value.trim()
}

/// Parses a model reply. Anything except a JSON object is rejected.
pub fn parse_reply(raw: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(cleaned)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!(
            "Expected a JSON object in the reply, got {}",
            kind_of(&other)
        )),
    }
}

/// Parses the reply and replaces the summary document with it.
pub async fn store_reply(raw: &str, summary_path: &Path) -> Result<()> {
    let summary = parse_reply(raw)?;
    write_json_atomically(summary_path, &summary).await
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
