//! API key validation by a minimal probe request.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{ChatCompletionRequest, ChatMessage, CompletionApi, UpstreamReply};

const PROBE_PROMPT: &str = "ping";
const GENERIC_REJECTION: &str = "API key was rejected";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API key is required")]
    MissingKey,

    /// The completion API answered and refused the key.
    #[error("{0}")]
    Rejected(String),

    /// The completion API could not be asked, or its answer was unreadable.
    #[error("could not validate API key: {0}")]
    Transport(String),
}

#[derive(Clone)]
pub struct ValidationService {
    completion: Arc<dyn CompletionApi>,
    model: String,
}

impl std::fmt::Debug for ValidationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationService")
            .field("model", &self.model)
            .finish()
    }
}

impl ValidationService {
    pub fn new(completion: Arc<dyn CompletionApi>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    /// Check `api_key` against the completion API without touching any
    /// stored settings.
    pub async fn validate(&self, api_key: &str) -> Result<(), ValidationError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ValidationError::MissingKey);
        }

        let probe = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(PROBE_PROMPT)],
            temperature: None,
            max_tokens: Some(1),
        };

        match self.completion.complete(api_key, &probe).await {
            Ok(UpstreamReply::Success { .. }) => {
                info!("API key accepted by completion API");
                Ok(())
            }
            Ok(UpstreamReply::Rejected { status, message }) => {
                info!(status, "API key rejected by completion API");
                Err(ValidationError::Rejected(
                    message.unwrap_or_else(|| GENERIC_REJECTION.to_owned()),
                ))
            }
            Ok(UpstreamReply::Malformed { status, detail }) => {
                warn!(status, %detail, "unreadable validation response");
                Err(ValidationError::Transport(format!(
                    "unexpected response from completion API (status {status})"
                )))
            }
            Err(e) => {
                warn!(error = %e, "validation request failed");
                Err(ValidationError::Transport(e.to_string()))
            }
        }
    }
}
