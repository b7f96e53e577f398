//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::{CredentialHolder, JsonStore};
use crate::handlers::{ChatService, SettingsService, ValidationService};
use crate::models::CompletionApi;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persona and API key reconciliation.
    pub settings: SettingsService,
    /// Probe calls for candidate API keys.
    pub validator: ValidationService,
    /// Completion round trips and history recording.
    pub chat: ChatService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: JsonStore,
        credentials: Arc<CredentialHolder>,
        completion: Arc<dyn CompletionApi>,
    ) -> Self {
        let settings = SettingsService::new(store.clone(), credentials.clone());
        let validator = ValidationService::new(completion.clone(), config.model.clone());
        let chat = ChatService::new(
            store,
            credentials,
            completion,
            config.model.clone(),
            config.temperature,
        );

        Self {
            config: Arc::new(config),
            settings,
            validator,
            chat,
        }
    }
}
