use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const AISOP_DIR: &str = ".ai-sop";
pub const PHASE_TRACKING_DIR: &str = ".ai-sop/phase-tracking";
pub const CONFIG_FILE: &str = ".ai-sop/config.yaml";

pub const SESSION_FILE_PREFIX: &str = "session-";
pub const SESSION_FILE_SUFFIX: &str = ".json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn aisop_dir(root: &Path) -> PathBuf {
    root.join(AISOP_DIR)
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join(PHASE_TRACKING_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// File name for a session. Agent ids are caller-supplied and unvalidated,
/// so anything outside `[A-Za-z0-9._-]` is replaced in the file name only.
pub fn session_file_name(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{SESSION_FILE_PREFIX}{safe}{SESSION_FILE_SUFFIX}")
}

pub fn is_session_file(name: &str) -> bool {
    name.starts_with(SESSION_FILE_PREFIX) && name.ends_with(SESSION_FILE_SUFFIX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
