// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rb-core: Domain model for the event-sourced reference repository
//!
//! This crate provides:
//! - Value types for OTUs, isolates, sequences, plans and accessions
//! - The closed set of event payloads and their record format
//! - Pure state transitions and OTU rehydration from events
//! - Invariant validation run before a transaction commits
//! - Clock and id abstractions for deterministic tests

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod clock;
pub mod id;

pub mod accession;
pub mod meta;
pub mod molecule;
pub mod otu;
pub mod plan;

// Events (order matters for dependencies)
pub mod event;
pub mod apply;
pub mod rehydrate;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

// Re-exports
pub use accession::{Accession, AccessionError};
pub use apply::ApplyError;
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{
    CreateIsolateData, CreateOtuData, CreatePlanData, CreateRepoData, CreateSequenceData,
    DeleteIsolateData, DeleteSequenceData, Event, EventError, EventPayload, EventRecord, EventType,
    LinkSequenceData, RenameIsolateData, SetRepresentativeIsolateData, Target, TargetKind,
    UnlinkSequenceData, UpdateExcludedAccessionsData,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use meta::{DataType, RepoMeta, RepoSettings};
pub use molecule::{MolType, Molecule, Strandedness, Topology};
pub use otu::{Isolate, IsolateName, IsolateNameType, Otu, OtuMinimal, Sequence};
pub use plan::{Plan, PlanError, Segment, SegmentName, SegmentRule};
pub use rehydrate::{rehydrate, RehydrateError};
pub use validate::{validate, ValidationIssue};
