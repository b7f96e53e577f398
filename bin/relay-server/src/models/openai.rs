//! Wire types of the OpenAI-compatible `/chat/completions` endpoint.
//!
//! Only the fields this server sends or reads are modelled; everything else
//! in an upstream response is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request ──────────────────────────────────────────────────────────────────

/// A single message in the conversation sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author (`"system"`, `"user"`, `"assistant"`).
    pub role: String,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature in [0, 2].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Response body, success and error shapes combined.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionBody {
    #[serde(default)]
    pub choices: Option<Vec<CompletionChoice>>,
    /// `{"message": "..."}` on most providers, occasionally a bare string.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionBody {
    /// Content of the first choice, if it is present and non-empty.
    pub fn first_content(&self) -> Option<String> {
        self.choices
            .as_ref()?
            .first()?
            .message
            .as_ref()?
            .content
            .clone()
            .filter(|c| !c.is_empty())
    }

    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_owned)
            .filter(|m| !m.is_empty())
    }
}
