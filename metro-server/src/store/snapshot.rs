//! JSON snapshots of the network on disk.
//!
//! A snapshot holds stations, lines and suspensions. Trips are never
//! written: they are a projection of the lines and are regenerated after a
//! snapshot is restored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{MetroLine, Station, Suspension};

use super::{LineStore, StationStore, StoreError, SuspensionStore};

/// The persisted records of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub lines: Vec<MetroLine>,
    #[serde(default)]
    pub suspensions: Vec<Suspension>,
}

impl Snapshot {
    /// Copy every record out of a store.
    pub fn capture<S>(store: &S) -> Result<Self, StoreError>
    where
        S: StationStore + LineStore + SuspensionStore + ?Sized,
    {
        Ok(Self {
            stations: store.stations()?,
            lines: store.lines()?,
            suspensions: store.suspensions()?,
        })
    }

    /// Write every record into a store, replacing records with equal ids.
    pub fn restore_into<S>(self, store: &S) -> Result<(), StoreError>
    where
        S: StationStore + LineStore + SuspensionStore + ?Sized,
    {
        for station in self.stations {
            store.save_station(station)?;
        }
        for line in self.lines {
            store.save_line(line)?;
        }
        for suspension in self.suspensions {
            store.save_suspension(suspension)?;
        }
        Ok(())
    }
}

/// A snapshot file location.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            message: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        serde_json::from_str(&contents).map_err(|e| StoreError::Json {
            message: format!("failed to parse {}: {}", self.path.display(), e),
        })
    }

    /// Save the snapshot.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                message: format!("failed to create snapshot directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Json {
            message: format!("failed to serialize snapshot: {}", e),
        })?;

        std::fs::write(&self.path, json).map_err(|e| StoreError::Io {
            message: format!("failed to write snapshot file: {}", e),
        })?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
