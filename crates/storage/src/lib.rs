// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rb-storage: Durable event log and derived index
//!
//! ## Architecture
//!
//! ```text
//! EventPayload → LogEntry → EventLog → disk (src/events.jsonl)
//!                                          ↓
//!                               Index ← replay → .cache/index.json
//!                                 ↓
//!                          SnapshotCache → .cache/snapshots/
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod entry;
pub mod index;
pub mod log;
pub mod snapshot;

pub use entry::LogEntry;
pub use index::{EventIndexItem, Index, IndexError, MIN_PARTIAL_ID_LENGTH};
pub use log::{EventIter, EventLog, LogError};
pub use snapshot::{OtuSnapshot, SnapshotCache, SnapshotError};
