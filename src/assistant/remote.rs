use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::appsettings::AssistantSettings;

/// Best-effort text-in/text-out collaborator. Implementations may time out,
/// return malformed text, or be unconfigured entirely; callers must treat
/// every reply as optional and never wait on one indefinitely.
#[async_trait]
pub trait RemoteCommandClient: Send + Sync + 'static {
    async fn reply(&self, utterance: &str, context: &str) -> anyhow::Result<String>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// REST client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &AssistantSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }

    fn build_prompt(utterance: &str, context: &str) -> String {
        format!(
            "You are the assistant inside an alarm-clock app.\n\
             {context}\n\
             The user said: \"{utterance}\"\n\
             To set a single alarm, include: ACTION: SET_ALARM <time>\n\
             To delete one alarm, include: ACTION: DELETE_ALARM <id>\n\
             To delete every alarm, include: ACTION: DELETE_ALL\n\
             Multi-alarm and backup sequences are executed by the app itself; just confirm them.\n\
             Reply briefly and conversationally."
        )
    }
}

#[async_trait]
impl RemoteCommandClient for GeminiClient {
    async fn reply(&self, utterance: &str, context: &str) -> anyhow::Result<String> {
        anyhow::ensure!(self.is_configured(), "assistant api key is not configured");

        let prompt = Self::build_prompt(utterance, context);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let response = self
            .http
            .post(self.request_url())
            .json(&request)
            .send()
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "unexpected response code {}",
            response.status()
        );

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| anyhow::anyhow!("reply carried no text"))
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
