//! Client for the external chat-completion API.
//!
//! [`CompletionApi`] is the seam the services depend on; [`HttpCompletionClient`]
//! is the reqwest implementation.  Every upstream answer is classified into an
//! [`UpstreamReply`], and failures to obtain an answer at all are reported as
//! [`UpstreamError`], so callers never confuse "the API said no" with "the API
//! could not be reached".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::models::openai::{ChatCompletionRequest, CompletionBody};

/// Classified upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamReply {
    /// 2xx without a body-level `error`; `content` is the first choice's text.
    Success { content: Option<String> },
    /// Non-2xx status or a body-level `error`.
    Rejected { status: u16, message: Option<String> },
    /// The body could not be understood.
    Malformed { status: u16, detail: String },
}

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("completion API did not answer within {0:?}")]
    Timeout(Duration),

    #[error("could not reach completion API: {0}")]
    Transport(String),
}

#[async_trait]
pub trait CompletionApi: Send + Sync + 'static {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<UpstreamReply, UpstreamError>;
}

/// Classify a raw upstream response.
pub fn interpret(status: u16, body: &str) -> UpstreamReply {
    let parsed = serde_json::from_str::<CompletionBody>(body);

    // A refused request stays a rejection even when its body is unreadable.
    if !(200..300).contains(&status) {
        return UpstreamReply::Rejected {
            status,
            message: parsed.ok().and_then(|p| p.error_message()),
        };
    }

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            return UpstreamReply::Malformed {
                status,
                detail: e.to_string(),
            };
        }
    };

    if parsed.error.is_some() {
        return UpstreamReply::Rejected {
            status,
            message: parsed.error_message(),
        };
    }

    UpstreamReply::Success {
        content: parsed.first_content(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpCompletionClient {
    /// `base_url` is the API root, e.g. `https://api.deepseek.com`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("relay-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionApi for HttpCompletionClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!(status, body = %body, "completion API response");
        Ok(interpret(status, &body))
    }
}
