//! Shared test fixtures.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::Config;
use crate::entities::{CredentialHolder, JsonStore, MemoryBackend};
use crate::models::{ChatCompletionRequest, CompletionApi, UpstreamError, UpstreamReply};
use crate::state::AppState;

/// Scripted [`CompletionApi`] that records every call it receives.
pub struct StubCompletion {
    reply: Result<UpstreamReply, UpstreamError>,
    calls: Mutex<Vec<(String, ChatCompletionRequest)>>,
}

impl StubCompletion {
    pub fn replying(reply: Result<UpstreamReply, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn content(text: &str) -> Arc<Self> {
        Self::replying(Ok(UpstreamReply::Success {
            content: Some(text.to_owned()),
        }))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, ChatCompletionRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionApi for StubCompletion {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((api_key.to_owned(), request.clone()));
        self.reply.clone()
    }
}

/// Handles to everything behind an [`AppState`] built on in-memory backends.
pub struct Fixture {
    pub state: Arc<AppState>,
    pub store: JsonStore,
    pub store_backend: Arc<MemoryBackend>,
    pub credentials: Arc<CredentialHolder>,
    pub upstream: Arc<StubCompletion>,
}

pub fn fixture(api_key: Option<&str>, upstream: Arc<StubCompletion>) -> Fixture {
    fixture_with_store(api_key, upstream, Arc::new(MemoryBackend::new()))
}

pub fn fixture_with_store(
    api_key: Option<&str>,
    upstream: Arc<StubCompletion>,
    store_backend: Arc<MemoryBackend>,
) -> Fixture {
    let store = JsonStore::new(store_backend.clone());
    let credentials = Arc::new(CredentialHolder::load(
        Arc::new(MemoryBackend::new()),
        "DEEPSEEK_API_KEY",
        api_key.map(str::to_owned),
    ));
    let config = Config {
        enable_swagger: false,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        credentials.clone(),
        upstream.clone(),
    ));

    Fixture {
        state,
        store,
        store_backend,
        credentials,
        upstream,
    }
}
