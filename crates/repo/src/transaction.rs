// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction bookkeeping

use std::collections::BTreeSet;
use uuid::Uuid;

/// Result of a transaction that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Every event was validated and committed
    Committed(T),
    /// The body aborted; every event it wrote was pruned
    Aborted { reason: String },
}

impl<T> Outcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted { .. })
    }

    /// The committed value, if any
    pub fn committed(self) -> Option<T> {
        match self {
            Outcome::Committed(value) => Some(value),
            Outcome::Aborted { .. } => None,
        }
    }
}

/// State of the active transaction
#[derive(Debug)]
pub(crate) struct Transaction {
    /// Last event id before the transaction began
    pub(crate) start_id: u64,
    /// OTUs targeted by events written in this transaction
    pub(crate) affected: BTreeSet<Uuid>,
    pub(crate) abort_reason: Option<String>,
}

impl Transaction {
    pub(crate) fn new(start_id: u64) -> Self {
        Self {
            start_id,
            affected: BTreeSet::new(),
            abort_reason: None,
        }
    }
}
