//! API key storage.
//!
//! The key lives as a `NAME=value` line in an env file and, for the lifetime
//! of the process, in the in-memory copy held here.  Handlers read the copy;
//! [`CredentialHolder::set`] writes the file first and only swaps the copy
//! once the write succeeded, so both always agree.

use std::io;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{info, warn};

use crate::entities::DocumentBackend;

/// Leading part of every masked key.
pub const MASK_PREFIX: &str = "sk-";
/// Character used to hide the key; a submitted value containing it means
/// "keep the current key".
pub const MASK_CHAR: char = '*';
/// Fixed run of mask characters between the prefix and the visible tail.
pub const MASK_RUN: &str = "********";
/// Number of trailing key characters left visible.
pub const VISIBLE_TAIL: usize = 4;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key must fit on a single line")]
    MultiLine,

    #[error("API key must not contain a single quote")]
    SingleQuote,

    #[error("failed to persist API key: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Updated,
    /// Empty or masked input; nothing was written.
    Unchanged,
}

pub struct CredentialHolder {
    backend: Arc<dyn DocumentBackend>,
    name: String,
    current: RwLock<Option<String>>,
}

impl std::fmt::Debug for CredentialHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHolder")
            .field("name", &self.name)
            .field("key", &self.masked())
            .finish()
    }
}

impl CredentialHolder {
    /// Read the key named `name` from the env file behind `backend`.
    ///
    /// `fallback` (normally the process environment variable of the same
    /// name) is only used when the file has no usable entry.
    pub fn load(
        backend: Arc<dyn DocumentBackend>,
        name: impl Into<String>,
        fallback: Option<String>,
    ) -> Self {
        let name = name.into();
        let from_file = match backend.read() {
            Ok(Some(text)) => find_entry(&text, &name),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %name, error = %e, "failed to read env file");
                None
            }
        };

        let current = from_file
            .or(fallback)
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());

        Self {
            backend,
            name,
            current: RwLock::new(current),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Option<String> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.get().is_some()
    }

    /// Display-safe form of the current key, or `""` when none is set.
    pub fn masked(&self) -> String {
        self.get().map(|k| mask(&k)).unwrap_or_default()
    }

    /// Persist `raw` as the new key.
    ///
    /// Empty input and input containing [`MASK_CHAR`] are ignored.  On a
    /// write failure the in-memory key is left untouched.
    pub fn set(&self, raw: &str) -> Result<SetOutcome, CredentialError> {
        let value = raw.trim();
        if value.is_empty() || value.contains(MASK_CHAR) {
            return Ok(SetOutcome::Unchanged);
        }
        if value.contains(['\n', '\r']) {
            return Err(CredentialError::MultiLine);
        }
        if value.contains('\'') {
            return Err(CredentialError::SingleQuote);
        }

        // Held across the file write so the file and the copy change together.
        let mut current = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let existing = self.backend.read()?.unwrap_or_default();
        let updated = upsert_entry(&existing, &self.name, value);
        self.backend.write(&updated)?;
        *current = Some(value.to_owned());
        drop(current);

        info!(key = %self.name, masked = %mask(value), "API key updated");
        Ok(SetOutcome::Updated)
    }
}

/// `sk-********` followed by the last four characters of `key`, left-padded
/// with `*` when the key is shorter than that.
pub fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(VISIBLE_TAIL)..]
        .iter()
        .collect();
    format!(
        "{prefix}{run}{tail:*>width$}",
        prefix = MASK_PREFIX,
        run = MASK_RUN,
        width = VISIBLE_TAIL
    )
}

fn find_entry(text: &str, name: &str) -> Option<String> {
    dotenvy::from_read_iter(text.as_bytes())
        .filter_map(Result::ok)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

/// Key of a `KEY=value` / `export KEY=value` line; `None` for comments and
/// lines without `=`.
fn entry_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    line.split_once('=').map(|(key, _)| key.trim())
}

/// Replace the first `name=` line of `text`, or append one.
///
/// The value is single-quoted so the env-file parser reads it back verbatim
/// (no `$` expansion, `#` comments or escapes).
fn upsert_entry(text: &str, name: &str, value: &str) -> String {
    let entry = format!("{name}='{value}'");
    let mut replaced = false;

    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            if !replaced && entry_key(line) == Some(name) {
                replaced = true;
                entry.clone()
            } else {
                line.to_owned()
            }
        })
        .collect();

    if !replaced {
        lines.push(entry);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
