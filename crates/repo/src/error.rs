// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository error taxonomy

use rb_core::{AccessionError, EventError, PlanError, RehydrateError, ValidationIssue};
use rb_storage::{IndexError, LogError, SnapshotError};
use thiserror::Error;
use uuid::Uuid;

/// Errors from repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("event log is corrupt at line {line}: {reason}")]
    StorageCorruption { line: u64, reason: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {value}")]
    DuplicateResource { kind: &'static str, value: String },
    #[error("repository is locked by process {holder}")]
    LockConflict { holder: String },
    #[error("repository must be locked before starting a transaction")]
    LockRequired,
    #[error("a transaction is already active")]
    TransactionExists,
    #[error("writes require an active transaction")]
    TransactionRequired,
    #[error("OTU {otu_id} failed validation: {}", format_issues(.issues))]
    InvariantViolation {
        otu_id: Uuid,
        issues: Vec<ValidationIssue>,
    },
    #[error("transaction aborted: {reason}")]
    Aborted { reason: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not a repository: {0}")]
    NotARepository(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("event log error: {0}")]
    Log(LogError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("event error: {0}")]
    Event(#[from] EventError),
    #[error("rehydrate error: {0}")]
    Rehydrate(#[from] RehydrateError),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RepoError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        RepoError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, value: impl ToString) -> Self {
        RepoError::DuplicateResource {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<LogError> for RepoError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::Corruption { line, reason } => RepoError::StorageCorruption { line, reason },
            LogError::NotFound(id) => RepoError::not_found("event", id),
            other => RepoError::Log(other),
        }
    }
}

impl From<SnapshotError> for RepoError {
    fn from(e: SnapshotError) -> Self {
        RepoError::Index(IndexError::Snapshot(e))
    }
}

impl From<AccessionError> for RepoError {
    fn from(e: AccessionError) -> Self {
        RepoError::InvalidInput(e.to_string())
    }
}

impl From<PlanError> for RepoError {
    fn from(e: PlanError) -> Self {
        RepoError::InvalidInput(e.to_string())
    }
}
