// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource id generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Generates ids for OTUs, isolates, sequences and repositories
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> Uuid;
}

/// Random v4 UUID generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Sequential id generator for testing
///
/// Yields `00000000-0000-0000-0000-000000000001`, `...0002` and so on.
#[derive(Clone)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start counting from `n`
    pub fn starting_at(n: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(n)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u128(u128::from(n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
