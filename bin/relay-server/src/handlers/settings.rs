//! Persona and API key settings.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::entities::{CredentialError, CredentialHolder, JsonStore, SetOutcome, StoreError};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Current settings as shown to a client; the key is masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key_masked: String,
    pub persona: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    KeyUpdated { persona_saved: bool },
    PersonaOnly,
    Nothing,
}

impl SaveOutcome {
    pub fn message(self) -> &'static str {
        match self {
            SaveOutcome::KeyUpdated { persona_saved: true } => "API key and persona saved",
            SaveOutcome::KeyUpdated { persona_saved: false } => "API key saved",
            SaveOutcome::PersonaOnly => "Persona saved; API key unchanged",
            SaveOutcome::Nothing => "No changes detected",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsService {
    store: JsonStore,
    credentials: Arc<CredentialHolder>,
}

impl SettingsService {
    pub fn new(store: JsonStore, credentials: Arc<CredentialHolder>) -> Self {
        Self { store, credentials }
    }

    pub fn get_settings(&self) -> Settings {
        Settings {
            api_key_masked: self.credentials.masked(),
            persona: self.store.persona(),
        }
    }

    pub fn key_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    /// Apply a partial settings update.
    ///
    /// A supplied persona is always written, before and independently of the
    /// key.  The key is only replaced by a non-empty value free of the mask
    /// character.
    pub fn save_settings(
        &self,
        api_key: Option<&str>,
        persona: Option<&str>,
    ) -> Result<SaveOutcome, SettingsError> {
        let persona_saved = match persona {
            Some(p) => {
                self.store.set_persona(p)?;
                true
            }
            None => false,
        };

        let key_updated = match api_key {
            Some(key) => self.credentials.set(key)? == SetOutcome::Updated,
            None => false,
        };

        Ok(match (key_updated, persona_saved) {
            (true, persona_saved) => SaveOutcome::KeyUpdated { persona_saved },
            (false, true) => SaveOutcome::PersonaOnly,
            (false, false) => SaveOutcome::Nothing,
        })
    }

    /// Move an `apiKey` left in the data file by older releases into the env
    /// file.  Does nothing when a key is already configured.
    ///
    /// Returns whether a key was migrated.
    pub fn migrate_legacy_key(&self) -> Result<bool, SettingsError> {
        if self.credentials.is_configured() {
            return Ok(false);
        }
        let Some(legacy) = self.store.legacy_api_key() else {
            return Ok(false);
        };

        if self.credentials.set(&legacy)? != SetOutcome::Updated {
            warn!("legacy apiKey in data file is not usable; leaving it in place");
            return Ok(false);
        }
        // Re-saving keeps only the known fields.
        self.store.save(&self.store.load())?;
        info!(key = %self.credentials.name(), "migrated legacy apiKey out of the data file");
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::credential::{MASK_PREFIX, MASK_RUN};
    use crate::entities::MemoryBackend;

    fn service() -> (SettingsService, Arc<CredentialHolder>) {
        let store = JsonStore::new(Arc::new(MemoryBackend::new()));
        let credentials = Arc::new(CredentialHolder::load(
            Arc::new(MemoryBackend::new()),
            "DEEPSEEK_API_KEY",
            None,
        ));
        (SettingsService::new(store, credentials.clone()), credentials)
    }

    #[test]
    fn persona_round_trips_trimmed() {
        let (svc, _) = service();
        for p in ["pirate", "  spaced out  ", "\tmulti\nline\n", ""] {
            svc.save_settings(None, Some(p)).unwrap();
            assert_eq!(svc.get_settings().persona, p.trim());
        }
    }

    #[test]
    fn outcome_messages_are_distinct() {
        let (svc, _) = service();

        let both = svc.save_settings(Some("sk-abc-1234"), Some("tutor")).unwrap();
        assert_eq!(both, SaveOutcome::KeyUpdated { persona_saved: true });

        let key_only = svc.save_settings(Some("sk-abc-5678"), None).unwrap();
        assert_eq!(key_only, SaveOutcome::KeyUpdated { persona_saved: false });

        let persona_only = svc.save_settings(None, Some("tutor")).unwrap();
        assert_eq!(persona_only, SaveOutcome::PersonaOnly);

        let nothing = svc.save_settings(None, None).unwrap();
        assert_eq!(nothing, SaveOutcome::Nothing);

        let messages = [both, key_only, persona_only, nothing].map(SaveOutcome::message);
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn masked_key_is_never_stored() {
        let (svc, credentials) = service();
        svc.save_settings(Some("sk-real-secret-9999"), None).unwrap();

        let shown = svc.get_settings().api_key_masked;
        let outcome = svc.save_settings(Some(&shown), Some("p")).unwrap();

        assert_eq!(outcome, SaveOutcome::PersonaOnly);
        assert_eq!(credentials.get().as_deref(), Some("sk-real-secret-9999"));
    }

    #[test]
    fn empty_key_changes_nothing() {
        let (svc, credentials) = service();
        assert_eq!(svc.save_settings(Some(""), None).unwrap(), SaveOutcome::Nothing);
        assert!(credentials.get().is_none());
    }

    #[test]
    fn masked_form_shape() {
        let (svc, _) = service();
        assert_eq!(svc.get_settings().api_key_masked, "");

        for key in ["sk-0123456789abcdef", "abc", "kunci-rahasia-ZZ42"] {
            svc.save_settings(Some(key), None).unwrap();
            let masked = svc.get_settings().api_key_masked;
            assert_eq!(masked.chars().count(), MASK_PREFIX.len() + MASK_RUN.len() + 4);
            if key.len() >= 4 {
                assert!(masked.ends_with(&key[key.len() - 4..]));
            }
        }
    }

    #[test]
    fn persona_is_saved_even_when_key_write_fails() {
        let store_backend = Arc::new(MemoryBackend::new());
        let store = JsonStore::new(store_backend);
        let credentials = Arc::new(CredentialHolder::load(
            Arc::new(MemoryBackend::read_only(None)),
            "DEEPSEEK_API_KEY",
            None,
        ));
        let svc = SettingsService::new(store, credentials);

        let err = svc.save_settings(Some("sk-new"), Some("kept")).unwrap_err();
        assert!(matches!(err, SettingsError::Credential(CredentialError::Io(_))));
        assert_eq!(svc.get_settings().persona, "kept");
        assert_eq!(svc.get_settings().api_key_masked, "");
    }

    #[test]
    fn overlapping_saves_may_lose_an_update() {
        // Documents last-writer-wins: a writer holding a stale snapshot
        // overwrites a persona saved in between.
        let backend = Arc::new(MemoryBackend::new());
        let store = JsonStore::new(backend);
        let credentials = Arc::new(CredentialHolder::load(
            Arc::new(MemoryBackend::new()),
            "DEEPSEEK_API_KEY",
            None,
        ));
        let svc = SettingsService::new(store.clone(), credentials);

        let stale = store.load();
        svc.save_settings(None, Some("first")).unwrap();
        store.save(&stale).unwrap();

        assert_eq!(svc.get_settings().persona, "");
    }
    #[test]
    fn legacy_key_moves_to_env_file() {
        let store_backend = Arc::new(MemoryBackend::with_contents(
            r#"{"persona":"p","chats":[],"apiKey":"sk-legacy-7777"}"#,
        ));
        let env_backend = Arc::new(MemoryBackend::new());
        let credentials = Arc::new(CredentialHolder::load(
            env_backend.clone(),
            "DEEPSEEK_API_KEY",
            None,
        ));
        let svc = SettingsService::new(JsonStore::new(store_backend.clone()), credentials.clone());

        assert!(svc.migrate_legacy_key().unwrap());
        assert_eq!(credentials.get().as_deref(), Some("sk-legacy-7777"));
        assert!(env_backend.snapshot().unwrap().contains("DEEPSEEK_API_KEY='sk-legacy-7777'"));

        let data = store_backend.snapshot().unwrap();
        assert!(!data.contains("apiKey"));
        assert!(data.contains("\"persona\": \"p\""));

        assert!(!svc.migrate_legacy_key().unwrap());
    }

    #[test]
    fn configured_key_wins_over_legacy() {
        let store_backend = Arc::new(MemoryBackend::with_contents(r#"{"apiKey":"sk-old"}"#));
        let credentials = Arc::new(CredentialHolder::load(
            Arc::new(MemoryBackend::new()),
            "DEEPSEEK_API_KEY",
            Some("sk-current".into()),
        ));
        let svc = SettingsService::new(JsonStore::new(store_backend.clone()), credentials.clone());

        assert!(!svc.migrate_legacy_key().unwrap());
        assert_eq!(credentials.get().as_deref(), Some("sk-current"));
        assert!(store_backend.snapshot().unwrap().contains("sk-old"));
    }
}
