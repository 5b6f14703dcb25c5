use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::ChatBackend;
use crate::conversation_state::{Role, Turn};
use crate::error::BackendError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral:latest";

const CONNECTION_ERROR: &str =
    "Could not connect to Ollama. Make sure Ollama is running with: ollama serve";

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Local backend speaking Ollama's plain completion endpoint.
pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(client: Client, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn generate(&self, history: &[Turn], message: &str) -> Result<String, BackendError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt: build_prompt(history, message),
            stream: false,
        };

        debug!("Sending prompt to Ollama ({}): {}", self.model, request.prompt);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                debug!("Ollama request failed: {}", e);
                BackendError::new(CONNECTION_ERROR)
            })?;

        if !response.status().is_success() {
            debug!("Ollama request failed with status: {}", response.status());
            return Err(BackendError::new(CONNECTION_ERROR));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            debug!("Malformed Ollama response: {}", e);
            BackendError::new(CONNECTION_ERROR)
        })?;

        Ok(ollama_response.response.trim().to_string())
    }
}

/// Flattens the history into a transcript ending with an open assistant cue.
pub fn build_prompt(history: &[Turn], message: &str) -> String {
    let mut prompt = String::new();
    for turn in history {
        let speaker = match turn.role() {
            Role::User => "Usuario",
            Role::Model => "Asistente",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(turn.text());
        prompt.push('\n');
    }
    prompt.push_str("Usuario: ");
    prompt.push_str(message);
    prompt.push_str("\nAsistente:");
    prompt
}
