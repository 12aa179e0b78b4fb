use crate::error::AppError;
use aisop_core::PhaseTracker;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

const POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<PhaseTracker>>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(tracker: PhaseTracker) -> Self {
        let data_dir = tracker.store().dir().to_path_buf();
        let state = Self {
            tracker: Arc::new(Mutex::new(tracker)),
            data_dir,
        };

        // Session files are written by separate CLI processes; watch the data
        // directory mtime (atomic writes rename into it) and reload on change.
        // Guard: only spawn if inside a Tokio runtime (skipped in sync unit tests).
        if tokio::runtime::Handle::try_current().is_ok() {
            let tracker = Arc::clone(&state.tracker);
            let dir = state.data_dir.clone();
            tokio::spawn(async move {
                let mut last_mtime = mtime(&dir).await;
                loop {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    let current = mtime(&dir).await;
                    if current.is_some() && current != last_mtime {
                        last_mtime = current;
                        reload(&tracker);
                    }
                }
            });
        }

        state
    }

    pub fn tracker(&self) -> Result<MutexGuard<'_, PhaseTracker>, AppError> {
        self.tracker
            .lock()
            .map_err(|_| AppError(anyhow::anyhow!("phase tracker lock poisoned")))
    }
}

async fn mtime(dir: &std::path::Path) -> Option<SystemTime> {
    tokio::fs::metadata(dir).await.ok()?.modified().ok()
}

fn reload(tracker: &Mutex<PhaseTracker>) {
    let Ok(mut tracker) = tracker.lock() else {
        tracing::warn!("phase tracker lock poisoned; skipping reload");
        return;
    };
    match tracker.reload() {
        Ok(count) => tracing::debug!(count, "reloaded sessions after data directory change"),
        Err(e) => tracing::warn!(error = %e, "failed to reload sessions"),
    }
}
