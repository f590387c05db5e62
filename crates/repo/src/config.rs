// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository runtime configuration
//!
//! Read from an optional `config.toml` at the repository root. Every field
//! has a default, so a missing file or a partial table is fine.

use crate::error::RepoError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the optional configuration file at the repository root
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Serve reads from cached OTU snapshots when they are current
    pub snapshot_cache: bool,
    /// `fsync` the event log after every append
    pub sync_writes: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            snapshot_cache: true,
            sync_writes: true,
        }
    }
}

impl RepoConfig {
    pub fn with_snapshot_cache(mut self, enabled: bool) -> Self {
        self.snapshot_cache = enabled;
        self
    }

    pub fn with_sync_writes(mut self, enabled: bool) -> Self {
        self.sync_writes = enabled;
        self
    }

    /// Load `config.toml` from `root`, falling back to defaults when absent
    pub fn load(root: &Path) -> Result<Self, RepoError> {
        let path = root.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
