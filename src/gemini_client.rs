use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::backend::ChatBackend;
use crate::conversation_state::{Role, Turn};
use crate::error::BackendError;

pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: Role,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Cloud backend speaking the `generateContent` API.
pub struct GeminiClient {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            client,
        }
    }

    fn endpoint(&self) -> Result<Url, BackendError> {
        Url::parse_with_params(&self.api_url, &[("key", self.api_key.as_str())]).map_err(|e| {
            debug!("Invalid Gemini API URL {}: {}", self.api_url, e);
            BackendError::new(format!("Invalid Gemini API URL: {}", e))
        })
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, history: &[Turn], message: &str) -> Result<String, BackendError> {
        let endpoint = self.endpoint()?;
        let request_body = build_request(history, message);

        debug!(
            "Sending request to Gemini API: {}",
            serde_json::to_string_pretty(&request_body).unwrap_or_default()
        );

        let response = self
            .client
            .post(endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                debug!("Gemini request failed: {}", e);
                BackendError::new(format!("Could not reach Gemini: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            debug!("Failed to read Gemini response body: {}", e);
            BackendError::new(format!("Could not read Gemini response: {}", e))
        })?;

        debug!("Received response from Gemini API ({}): {}", status, body);

        if !status.is_success() {
            debug!("API request failed with response: {}", body);
            return Err(BackendError::new(error_message(status, &body)));
        }

        parse_reply(&body)
    }
}

fn build_request<'a>(history: &'a [Turn], message: &'a str) -> GenerateContentRequest<'a> {
    let contents = history
        .iter()
        .map(|turn| Content {
            role: turn.role(),
            parts: [Part { text: turn.text() }],
        })
        .chain(std::iter::once(Content {
            role: Role::User,
            parts: [Part { text: message }],
        }))
        .collect();

    GenerateContentRequest { contents }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Gemini request failed with status {}", status))
}

fn parse_reply(body: &str) -> Result<String, BackendError> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Malformed Gemini response: {}", e);
        BackendError::new("Unexpected response from Gemini")
    })?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| {
            debug!("Gemini response had no candidate text");
            BackendError::new("Unexpected response from Gemini")
        })?;

    Ok(strip_bold(&text).trim().to_string())
}

/// Drops markdown bold markers, keeping the enclosed text.
fn strip_bold(text: &str) -> String {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    let re = BOLD.get_or_init(|| Regex::new(r"(?s)\*\*(.*?)\*\*").expect("bold pattern is valid"));
    re.replace_all(text, "$1").into_owned()
}
