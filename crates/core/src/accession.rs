// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned sequence accessions (`KEY.VERSION`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing an accession string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessionError {
    #[error("accession {0:?} is missing a version suffix")]
    MissingVersion(String),
    #[error("accession {0:?} has an empty key")]
    EmptyKey(String),
    #[error("accession {0:?} has an invalid version")]
    InvalidVersion(String),
}

/// A sequence accession such as `NC_001367.1`
///
/// Ordered by key, then version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Accession {
    pub key: String,
    pub version: u32,
}

impl Accession {
    pub fn new(key: impl Into<String>, version: u32) -> Self {
        Self {
            key: key.into(),
            version,
        }
    }

    /// RefSeq accessions carry an underscore after their prefix
    pub fn is_refseq(&self) -> bool {
        self.key.contains('_')
    }
}

impl FromStr for Accession {
    type Err = AccessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (key, version) = s
            .rsplit_once('.')
            .ok_or_else(|| AccessionError::MissingVersion(s.to_string()))?;

        if key.is_empty() {
            return Err(AccessionError::EmptyKey(s.to_string()));
        }

        let version = version
            .parse::<u32>()
            .map_err(|_| AccessionError::InvalidVersion(s.to_string()))?;

        Ok(Self::new(key, version))
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.key, self.version)
    }
}

#[cfg(test)]
#[path = "accession_tests.rs"]
mod tests;
