use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::fs::operations::{read_json, JsonFile};

use super::{prompt::build_prompt, store_reply, Analyzer};

pub const API_KEY_VARIABLE: &str = "GEMINI_API_KEY";
const MODEL: &str = "gemini-2.5-flash";
const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Upper bound for one `generateContent` round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|v| v.text.as_str()).collect();
        Some(text).filter(|v| !v.trim().is_empty())
    }
}

/// [Analyzer] backed by Gemini's `generateContent`.
pub struct GeminiAnalyzer {
    client: Client,
    api_key: Option<String>,
}

impl GeminiAnalyzer {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, api_key })
    }

    /// A missing key is not an error until the first analysis, so the tracker can run without it.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var(API_KEY_VARIABLE).ok().filter(|v| !v.is_empty()))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{API_KEY_VARIABLE} is not set"))?;

        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(format!("{ENDPOINT}/{MODEL}:generateContent"))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini request failed with HTTP {status}: {body}"));
        }

        response
            .json::<GenerateResponse>()
            .await?
            .text()
            .ok_or_else(|| anyhow!("Gemini returned no text"))
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    #[instrument(skip(self))]
    async fn analyze(&self, log_path: &Path, summary_path: &Path) -> Result<()> {
        let log = match read_json::<Value>(log_path).await? {
            JsonFile::Loaded(log) => log,
            JsonFile::Missing => return Err(anyhow!("No activity recorded yet in {log_path:?}")),
            JsonFile::Corrupt(e) => return Err(anyhow!("Activity log {log_path:?} is corrupt: {e}")),
        };

        info!("Starting analysis");
        let reply = self.generate(&build_prompt(&log)).await?;
        debug!("Raw reply {reply}");

        store_reply(&reply, summary_path)
            .await
            .with_context(|| format!("Could not parse or save the reply: {reply}"))?;
        info!("Saved analysis to {summary_path:?}");
        Ok(())
    }
}
