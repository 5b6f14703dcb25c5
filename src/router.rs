use eyre::{Result, WrapErr};
use tracing::debug;

use crate::backend::{Backend, ChatBackend};
use crate::conversation_state::{ConversationState, Turn};
use crate::error::BackendError;
use crate::gemini_client::GeminiClient;
use crate::ollama_client::OllamaClient;
use crate::settings::Settings;

/// Per-conversation state: which backend answers, and what has been said.
#[derive(Debug)]
pub struct ChatSession {
    pub backend: Backend,
    pub conversation: ConversationState,
}

impl ChatSession {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            conversation: ConversationState::new(),
        }
    }
}

/// Dispatches a message to the adapter for the selected backend.
///
/// The router holds no conversation of its own; every call receives the
/// history it should send.
pub struct Router {
    gemini: Option<Box<dyn ChatBackend>>,
    ollama: Box<dyn ChatBackend>,
    ollama_model: String,
}

impl Router {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = settings
            .http_client()
            .wrap_err("failed to build HTTP client")?;

        let gemini = settings.gemini_api_key.as_ref().map(|key| {
            Box::new(GeminiClient::new(
                client.clone(),
                key.clone(),
                settings.gemini_api_url.clone(),
            )) as Box<dyn ChatBackend>
        });
        let ollama = OllamaClient::new(client, settings.ollama_url.clone(), settings.ollama_model.clone());
        let ollama_model = ollama.model().to_string();

        Ok(Self {
            gemini,
            ollama: Box::new(ollama),
            ollama_model,
        })
    }

    pub fn with_backends(
        gemini: Option<Box<dyn ChatBackend>>,
        ollama: Box<dyn ChatBackend>,
        ollama_model: impl Into<String>,
    ) -> Self {
        Self {
            gemini,
            ollama,
            ollama_model: ollama_model.into(),
        }
    }

    /// Human readable label for logs and the UI, e.g. `Ollama (mistral:latest)`.
    pub fn describe(&self, backend: Backend) -> String {
        match backend {
            Backend::Gemini => "Gemini".to_string(),
            Backend::Ollama => format!("Ollama ({})", self.ollama_model),
        }
    }

    pub fn is_available(&self, backend: Backend) -> bool {
        match backend {
            Backend::Gemini => self.gemini.is_some(),
            Backend::Ollama => true,
        }
    }

    fn adapter(&self, backend: Backend) -> Result<&dyn ChatBackend, BackendError> {
        match backend {
            Backend::Gemini => self
                .gemini
                .as_deref()
                .ok_or_else(|| BackendError::new("GEMINI_API_KEY is not configured")),
            Backend::Ollama => Ok(self.ollama.as_ref()),
        }
    }

    /// Returns the reply to `message` given the prior `history`. Never retries.
    pub async fn respond(
        &self,
        backend: Backend,
        history: &[Turn],
        message: &str,
    ) -> Result<String, BackendError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(BackendError::new("Message cannot be empty"));
        }

        let adapter = self.adapter(backend)?;
        debug!("Generating response with: {}", self.describe(backend));
        adapter.generate(history, message).await
    }

    /// Sends `message` with the session's history and commits the exchange on success.
    ///
    /// Taking the session mutably keeps a conversation to one request in flight.
    pub async fn send(&self, session: &mut ChatSession, message: &str) -> Result<String, BackendError> {
        let reply = self
            .respond(session.backend, session.conversation.turns(), message)
            .await?;
        session.conversation.commit_exchange(message.trim(), &reply);
        Ok(reply)
    }
}
