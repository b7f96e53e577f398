//! Persistence layer.
//!
//! The JSON document ([`JsonStore`]) and the `KEY=value` credential file
//! ([`CredentialHolder`]) both sit on top of a [`DocumentBackend`], which
//! reads and replaces a whole text document at a time.  The on-disk implementation is [`FileBackend`]; [`MemoryBackend`]
//! keeps the document in memory and is used by tests.

pub mod credential;
pub mod dao;
pub mod store;

pub use credential::{CredentialError, CredentialHolder, SetOutcome};
pub use dao::Exchange;
pub use store::{JsonStore, StoreError};

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
#[cfg(test)]
use std::sync::Mutex;

use tempfile::NamedTempFile;

/// Whole-document text storage.
///
/// `read` returns `Ok(None)` when the document does not exist yet.  `write`
/// replaces the document in full; readers never observe a partial write.
pub trait DocumentBackend: Send + Sync + 'static {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, contents: &str) -> io::Result<()>;
}

/// A document stored as a single file on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentBackend for FileBackend {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write to a temp file next to the target, fsync, then rename over it.
    fn write(&self, contents: &str) -> io::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };

        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory document, optionally refusing writes to simulate a broken disk.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: false,
        }
    }

    /// A backend whose every `write` fails with `PermissionDenied`.
    pub fn read_only(contents: Option<String>) -> Self {
        Self {
            contents: Mutex::new(contents),
            fail_writes: true,
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

#[cfg(test)]
impl DocumentBackend for MemoryBackend {
    fn read(&self) -> io::Result<Option<String>> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|_| io::Error::other("memory backend poisoned"))
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory backend is read-only",
            ));
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| io::Error::other("memory backend poisoned"))?;
        *guard = Some(contents.to_owned());
        Ok(())
    }
}
