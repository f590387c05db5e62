// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository-level metadata recorded by the first event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of data a repository holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Barcode,
    Genome,
}

/// Tunables that apply to every OTU in a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSettings {
    /// Fractional deviation from a segment length accepted by default
    #[serde(default = "default_segment_length_tolerance")]
    pub default_segment_length_tolerance: f64,
}

fn default_segment_length_tolerance() -> f64 {
    0.03
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            default_segment_length_tolerance: default_segment_length_tolerance(),
        }
    }
}

/// Repository metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMeta {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data_type: DataType,
    pub name: String,
    pub organism: String,
    pub settings: RepoSettings,
}
