//! Session persistence adapters.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::SessionConfig;
use crate::ports::{SessionError, SessionStore};

/// Session stored as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionConfig>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&raw)
            .map_err(|e| SessionError::Parse(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(session))
    }

    fn save(&self, session: &SessionConfig) -> Result<(), SessionError> {
        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| SessionError::Parse(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves half a session behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        debug!("[cf-session] Saved session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<SessionConfig>>,
}

impl MemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionConfig>, SessionError> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &SessionConfig) -> Result<(), SessionError> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.session.lock() = None;
        Ok(())
    }
}
