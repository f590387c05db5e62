// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached OTU snapshots
//!
//! A snapshot is the materialized OTU at a given event id. Snapshots are a
//! disposable cache: an unreadable file is treated as a miss.

use rb_core::Otu;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An OTU materialized at `at_event`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtuSnapshot {
    pub version: u32,
    pub at_event: u64,
    pub otu: Otu,
}

impl OtuSnapshot {
    /// Current version of the snapshot format
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(otu: Otu, at_event: u64) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            at_event,
            otu,
        }
    }
}

/// Directory of per-OTU snapshot files
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, otu_id: Uuid) -> PathBuf {
        self.dir.join(format!("{otu_id}.json"))
    }

    /// Write a snapshot atomically
    pub fn save(&self, snapshot: &OtuSnapshot) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(snapshot.otu.id);
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load a snapshot, treating missing or unreadable files as a miss
    pub fn load(&self, otu_id: Uuid) -> Option<OtuSnapshot> {
        let path = self.path_for(otu_id);
        let file = File::open(&path).ok()?;

        match serde_json::from_reader::<_, OtuSnapshot>(BufReader::new(file)) {
            Ok(snapshot) if snapshot.version == OtuSnapshot::CURRENT_VERSION => Some(snapshot),
            Ok(snapshot) => {
                tracing::warn!(
                    %otu_id,
                    version = snapshot.version,
                    "ignoring snapshot with unsupported version"
                );
                None
            }
            Err(e) => {
                tracing::warn!(?e, %otu_id, "ignoring unreadable snapshot");
                None
            }
        }
    }

    pub fn remove(&self, otu_id: Uuid) -> Result<(), SnapshotError> {
        match fs::remove_file(self.path_for(otu_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every snapshot
    pub fn clear(&self) -> Result<(), SnapshotError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
