// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory single-writer lock for a repository directory
//!
//! The lock is a marker file holding the owner's process id. It is created
//! exclusively and additionally held with an OS file lock while owned.

use crate::error::RepoError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Name of the lock marker file at the repository root
pub const LOCK_FILE: &str = "lock";

pub struct Lock {
    path: PathBuf,
    // NOTE(lifetime): Held to maintain the exclusive file lock; released on drop
    file: Option<File>,
}

impl Lock {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(LOCK_FILE),
            file: None,
        }
    }

    /// Take the lock, or succeed immediately if already held by this handle
    pub fn acquire(&mut self) -> Result<(), RepoError> {
        if self.file.is_some() {
            return Ok(());
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RepoError::LockConflict {
                    holder: self.holder().unwrap_or_else(|| "unknown".to_string()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.try_lock_exclusive() {
            drop(file);
            if let Err(remove_err) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    ?remove_err,
                    path = %self.path.display(),
                    "failed to remove lock marker"
                );
            }
            return Err(e.into());
        }

        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        tracing::debug!(path = %self.path.display(), "acquired repository lock");
        self.file = Some(file);
        Ok(())
    }

    /// Release the lock and remove the marker file
    pub fn release(&mut self) -> Result<(), RepoError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        drop(file);

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(path = %self.path.display(), "released repository lock");
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Process id recorded in the marker file, if any
    pub fn holder(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(?e, "failed to release repository lock");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
