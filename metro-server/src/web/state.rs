//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::schedule::ScheduleConfig;
use crate::store::{MemoryStore, Snapshot, SnapshotFile};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The network records and trip collections
    pub store: Arc<MemoryStore>,

    /// Trip generation and search configuration
    pub config: Arc<ScheduleConfig>,

    /// Where to persist the network after each change, if anywhere
    pub snapshot: Option<Arc<SnapshotFile>>,

    /// Held for the whole of every mutating request, so one change at a
    /// time reads and rewrites the store.
    writes: Arc<Mutex<()>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(store: MemoryStore, config: ScheduleConfig, snapshot: Option<SnapshotFile>) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            snapshot: snapshot.map(Arc::new),
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Wait for exclusive write access.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Save the current network to the snapshot file.
    ///
    /// A failed save is logged and does not fail the request that caused
    /// it; the change is already in the store.
    pub fn persist(&self) {
        let Some(file) = &self.snapshot else {
            return;
        };
        let result = Snapshot::capture(self.store.as_ref()).and_then(|snapshot| file.save(&snapshot));
        match result {
            Ok(()) => debug!(path = %file.path().display(), "Snapshot saved"),
            Err(e) => warn!(path = %file.path().display(), error = %e, "Failed to save snapshot"),
        }
    }
}
