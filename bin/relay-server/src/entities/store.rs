//! Whole-document JSON store.
//!
//! Every operation reads the full document and every mutation writes it back
//! in full.  There is no locking: two overlapping mutations race and the last
//! writer wins.

use std::io;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::entities::DocumentBackend;
use crate::entities::dao::{Exchange, StoreDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write store document: {0}")]
    Write(#[from] io::Error),
}

/// Shape of the first on-disk format, which kept the API key in the document.
#[derive(Deserialize)]
struct LegacyCredential {
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
}

#[derive(Clone)]
pub struct JsonStore {
    backend: Arc<dyn DocumentBackend>,
}

impl std::fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonStore")
    }
}

impl JsonStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Load the document, falling back to the default on any read or parse
    /// failure.
    pub fn load(&self) -> StoreDocument {
        let raw = match self.backend.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return StoreDocument::default(),
            Err(e) => {
                warn!(error = %e, "failed to read store document; using defaults");
                return StoreDocument::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "store document is not valid JSON; using defaults");
            StoreDocument::default()
        })
    }

    /// Replace the persisted document with `doc`, pretty-printed.
    pub fn save(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(doc)?;
        self.backend.write(&contents)?;
        Ok(())
    }

    pub fn persona(&self) -> String {
        self.load().persona
    }

    /// Store `persona` trimmed and return the value that was written.
    pub fn set_persona(&self, persona: &str) -> Result<String, StoreError> {
        let mut doc = self.load();
        doc.persona = persona.trim().to_owned();
        self.save(&doc)?;
        Ok(doc.persona)
    }

    pub fn append_exchange(&self, exchange: Exchange) -> Result<(), StoreError> {
        let mut doc = self.load();
        doc.chats.push(exchange);
        self.save(&doc)
    }

    /// The non-empty `apiKey` of a first-format document, if any.
    pub fn legacy_api_key(&self) -> Option<String> {
        let raw = self.backend.read().ok().flatten()?;
        serde_json::from_str::<LegacyCredential>(&raw)
            .ok()
            .and_then(|legacy| legacy.api_key)
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
    }
}
