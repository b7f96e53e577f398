//! Single-turn chat against the completion API.
//!
//! Every outcome, including failures, is turned into a reply string for the
//! caller.  Only replies that came back from a successful completion are
//! recorded in the history.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::entities::{CredentialHolder, Exchange, JsonStore};
use crate::models::{ChatCompletionRequest, ChatMessage, CompletionApi, UpstreamReply};

pub const NOT_CONFIGURED_REPLY: &str =
    "❌ API key is not set. Please fill it in on the settings page.";
pub const EMPTY_MESSAGE_REPLY: &str = "❌ Message is empty.";
pub const NO_ANSWER_REPLY: &str = "❌ The AI did not return an answer.";
pub const DEFAULT_PERSONA: &str =
    "You are a friendly, helpful AI that answers clearly.";

#[derive(Clone)]
pub struct ChatService {
    store: JsonStore,
    credentials: Arc<CredentialHolder>,
    completion: Arc<dyn CompletionApi>,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ChatService {
    pub fn new(
        store: JsonStore,
        credentials: Arc<CredentialHolder>,
        completion: Arc<dyn CompletionApi>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            store,
            credentials,
            completion,
            model: model.into(),
            temperature,
        }
    }

    pub async fn chat(&self, message: &str) -> String {
        let Some(api_key) = self.credentials.get() else {
            return NOT_CONFIGURED_REPLY.to_owned();
        };
        if message.trim().is_empty() {
            return EMPTY_MESSAGE_REPLY.to_owned();
        }

        let persona = self.store.persona();
        let request = self.build_request(&persona, message);
        debug!(model = %request.model, message_len = message.len(), "chat completion request");

        let reply = match self.completion.complete(&api_key, &request).await {
            Ok(UpstreamReply::Success { content }) => {
                content.unwrap_or_else(|| NO_ANSWER_REPLY.to_owned())
            }
            Ok(UpstreamReply::Rejected { status, message }) => {
                warn!(status, message = ?message, "completion API returned an error");
                return format!(
                    "❌ API error: {}",
                    message.as_deref().unwrap_or("Unknown error")
                );
            }
            Ok(UpstreamReply::Malformed { status, detail }) => {
                warn!(status, %detail, "unreadable completion response");
                return format!("❌ Server error: unreadable response from completion API ({detail})");
            }
            Err(e) => {
                warn!(error = %e, "completion request failed");
                return format!("❌ Server error: {e}");
            }
        };

        info!(reply_len = reply.len(), "chat completion done");

        if let Err(e) = self.store.append_exchange(Exchange::now(message, &reply)) {
            warn!(error = %e, "failed to save chat history");
        }

        reply
    }

    fn build_request(&self, persona: &str, message: &str) -> ChatCompletionRequest {
        let system = if persona.is_empty() { DEFAULT_PERSONA } else { persona };
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(message)],
            temperature: Some(self.temperature),
            max_tokens: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::MemoryBackend;
    use crate::models::UpstreamError;
    use crate::testing::StubCompletion;

    fn service_with(
        api_key: Option<&str>,
        stub: &Arc<StubCompletion>,
        backend: Arc<MemoryBackend>,
    ) -> (ChatService, JsonStore) {
        let store = JsonStore::new(backend);
        let credentials = Arc::new(CredentialHolder::load(
            Arc::new(MemoryBackend::new()),
            "DEEPSEEK_API_KEY",
            api_key.map(str::to_owned),
        ));
        let svc = ChatService::new(store.clone(), credentials, stub.clone(), "deepseek-chat", 0.7);
        (svc, store)
    }

    fn service(api_key: Option<&str>, stub: &Arc<StubCompletion>) -> (ChatService, JsonStore) {
        service_with(api_key, stub, Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let stub = StubCompletion::content("never");
        let (svc, store) = service(None, &stub);

        assert_eq!(svc.chat("hello").await, NOT_CONFIGURED_REPLY);
        assert_eq!(stub.call_count(), 0);
        assert!(store.load().chats.is_empty());
    }

    #[tokio::test]
    async fn blank_message_short_circuits() {
        let stub = StubCompletion::content("never");
        let (svc, store) = service(Some("sk-k"), &stub);

        assert_eq!(svc.chat("").await, EMPTY_MESSAGE_REPLY);
        assert_eq!(svc.chat("   ").await, EMPTY_MESSAGE_REPLY);
        assert_eq!(stub.call_count(), 0);
        assert!(store.load().chats.is_empty());
    }

    #[tokio::test]
    async fn request_uses_default_persona_and_verbatim_message() {
        let stub = StubCompletion::content("hi");
        let (svc, _) = service(Some("sk-k"), &stub);

        svc.chat("  halo  ").await;

        let (key, req) = stub.calls().remove(0);
        assert_eq!(key, "sk-k");
        assert_eq!(
            req.messages,
            vec![ChatMessage::system(DEFAULT_PERSONA), ChatMessage::user("  halo  ")]
        );
        assert_eq!(req.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn request_uses_stored_persona() {
        let stub = StubCompletion::content("arr");
        let (svc, store) = service(Some("sk-k"), &stub);
        store.set_persona("You are a pirate.").unwrap();

        svc.chat("hello").await;

        let (_, req) = stub.calls().remove(0);
        assert_eq!(req.messages[0], ChatMessage::system("You are a pirate."));
    }

    #[tokio::test]
    async fn replies_are_recorded_in_order() {
        let stub = StubCompletion::content("answer");
        let (svc, store) = service(Some("sk-k"), &stub);

        let messages = ["one", "two", "three"];
        for m in messages {
            assert_eq!(svc.chat(m).await, "answer");
        }

        let chats = store.load().chats;
        assert_eq!(chats.len(), 3);
        for (exchange, m) in chats.iter().zip(messages) {
            assert_eq!(exchange.user, m);
            assert_eq!(exchange.ai, "answer");
            assert!(exchange.time.is_some());
        }
    }

    #[tokio::test]
    async fn missing_content_is_a_recorded_placeholder() {
        let stub = StubCompletion::replying(Ok(UpstreamReply::Success { content: None }));
        let (svc, store) = service(Some("sk-k"), &stub);

        assert_eq!(svc.chat("q").await, NO_ANSWER_REPLY);
        assert_eq!(store.load().chats[0].ai, NO_ANSWER_REPLY);
    }

    #[tokio::test]
    async fn api_error_becomes_reply_and_is_not_recorded() {
        let stub = StubCompletion::replying(Ok(UpstreamReply::Rejected {
            status: 402,
            message: Some("Insufficient Balance".into()),
        }));
        let (svc, store) = service(Some("sk-k"), &stub);

        let reply = svc.chat("q").await;
        assert!(reply.contains("Insufficient Balance"), "got {reply}");
        assert!(store.load().chats.is_empty());
    }

    #[tokio::test]
    async fn api_error_without_message_uses_fallback() {
        let stub = StubCompletion::replying(Ok(UpstreamReply::Rejected {
            status: 500,
            message: None,
        }));
        let (svc, _) = service(Some("sk-k"), &stub);
        assert!(svc.chat("q").await.contains("Unknown error"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_reply() {
        let stub = StubCompletion::replying(Err(UpstreamError::Transport(
            "connection refused".into(),
        )));
        let (svc, store) = service(Some("sk-k"), &stub);

        let reply = svc.chat("q").await;
        assert!(reply.starts_with("❌ Server error"), "got {reply}");
        assert!(reply.contains("connection refused"));
        assert!(store.load().chats.is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn history_failure_still_returns_reply() {
        let stub = StubCompletion::content("still here");
        let (svc, _) = service_with(Some("sk-k"), &stub, Arc::new(MemoryBackend::read_only(None)));

        assert_eq!(svc.chat("q").await, "still here");
        assert!(logs_contain("failed to save chat history"));
    }
}
