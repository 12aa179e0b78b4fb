//! One JSON file per session under the tracker's data directory.

use crate::error::Result;
use crate::paths;
use crate::session::AgentSession;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `<root>/.ai-sop/phase-tracking`.
    pub fn for_root(root: &Path) -> Self {
        Self::new(paths::data_dir(root))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        crate::io::ensure_dir(&self.dir)
    }

    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(paths::session_file_name(session_id))
    }

    /// Whole-file overwrite of the session's JSON representation.
    pub fn save(&self, session: &AgentSession) -> Result<()> {
        let data = serde_json::to_string_pretty(session)?;
        crate::io::atomic_write(&self.session_path(&session.session_id), data.as_bytes())
    }

    pub fn load(&self, path: &Path) -> Result<AgentSession> {
        let data = std::fs::read_to_string(path)?;
        let session: AgentSession = serde_json::from_str(&data)?;
        Ok(session)
    }

    /// Deserialize every session file in the data directory. Files that
    /// fail to read or parse are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<AgentSession>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !paths::is_session_file(&name) || !entry.file_type()?.is_file() {
                continue;
            }
            match self.load(&entry.path()) {
                Ok(s) => sessions.push(s),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "skipping unreadable session file");
                }
            }
        }
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(sessions)
    }

    /// Remove a session's file. A file that is already gone is not an error.
    pub fn remove(&self, session_id: &str) -> Result<()> {
        match std::fs::remove_file(self.session_path(session_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
