use thiserror::Error;

/// The single error surfaced for any failed round trip to a backend.
///
/// Network failures, non-success statuses and unexpected response shapes all
/// collapse into this type: the caller has exactly one recovery path (show
/// the message, keep the conversation as it was).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
