use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::conversation_state::Turn;
use crate::error::BackendError;

/// The two interchangeable model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Gemini,
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::Ollama => "ollama",
        }
    }

    pub fn all() -> [Backend; 2] {
        [Backend::Gemini, Backend::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Gemini => "Gemini (Google)",
            Backend::Ollama => "Ollama (Local)",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Backend::Gemini),
            "ollama" => Ok(Backend::Ollama),
            other => {
                let expected: Vec<&str> = Backend::all().iter().map(Backend::as_str).collect();
                Err(format!(
                    "unknown backend '{}', expected one of: {}",
                    other,
                    expected.join(", ")
                ))
            }
        }
    }
}

/// A provider that turns a conversation plus a new user message into reply text.
///
/// Implementations own their wire format entirely. They never touch the
/// caller's history; committing the exchange is the router's job.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, history: &[Turn], message: &str) -> Result<String, BackendError>;
}
