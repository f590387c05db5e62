// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types
//!
//! Every change to a repository is recorded as an [`Event`]: a typed payload,
//! the resource it targets and the id and timestamp assigned by the log.
//! On disk an event is an [`EventRecord`] whose `type` discriminant selects
//! the schema of its `data` object.

use crate::accession::Accession;
use crate::meta::{DataType, RepoSettings};
use crate::molecule::Molecule;
use crate::otu::IsolateName;
use crate::plan::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors converting between records and typed events
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid {event_type} payload in event {id}: {source}")]
    Payload {
        id: u64,
        event_type: EventType,
        source: serde_json::Error,
    },
    #[error("{event_type} must target a {expected}, found a {found}")]
    TargetMismatch {
        event_type: EventType,
        expected: TargetKind,
        found: TargetKind,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The kind of resource a [`Target`] names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Repo,
    Otu,
    Isolate,
    Sequence,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Repo => "repository",
            TargetKind::Otu => "OTU",
            TargetKind::Isolate => "isolate",
            TargetKind::Sequence => "sequence",
        };
        f.write_str(s)
    }
}

/// The resource an event concerns
///
/// Stored as the event's `query` object. Variants are tried most specific
/// first when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Sequence {
        otu_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        isolate_id: Option<Uuid>,
        sequence_id: Uuid,
    },
    Isolate {
        otu_id: Uuid,
        isolate_id: Uuid,
    },
    Otu {
        otu_id: Uuid,
    },
    Repo {
        repository_id: Uuid,
    },
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Sequence { .. } => TargetKind::Sequence,
            Target::Isolate { .. } => TargetKind::Isolate,
            Target::Otu { .. } => TargetKind::Otu,
            Target::Repo { .. } => TargetKind::Repo,
        }
    }

    /// The OTU this event belongs to, if any
    pub fn otu_id(&self) -> Option<Uuid> {
        match self {
            Target::Sequence { otu_id, .. }
            | Target::Isolate { otu_id, .. }
            | Target::Otu { otu_id } => Some(*otu_id),
            Target::Repo { .. } => None,
        }
    }

    pub fn isolate_id(&self) -> Option<Uuid> {
        match self {
            Target::Sequence { isolate_id, .. } => *isolate_id,
            Target::Isolate { isolate_id, .. } => Some(*isolate_id),
            _ => None,
        }
    }

    pub fn sequence_id(&self) -> Option<Uuid> {
        match self {
            Target::Sequence { sequence_id, .. } => Some(*sequence_id),
            _ => None,
        }
    }
}

/// Discriminant stored in the `type` field of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    CreateRepo,
    #[serde(rename = "CreateOTU")]
    CreateOtu,
    CreatePlan,
    SetRepresentativeIsolate,
    UpdateExcludedAccessions,
    CreateIsolate,
    RenameIsolate,
    DeleteIsolate,
    LinkSequence,
    UnlinkSequence,
    CreateSequence,
    DeleteSequence,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CreateRepo => "CreateRepo",
            EventType::CreateOtu => "CreateOTU",
            EventType::CreatePlan => "CreatePlan",
            EventType::SetRepresentativeIsolate => "SetRepresentativeIsolate",
            EventType::UpdateExcludedAccessions => "UpdateExcludedAccessions",
            EventType::CreateIsolate => "CreateIsolate",
            EventType::RenameIsolate => "RenameIsolate",
            EventType::DeleteIsolate => "DeleteIsolate",
            EventType::LinkSequence => "LinkSequence",
            EventType::UnlinkSequence => "UnlinkSequence",
            EventType::CreateSequence => "CreateSequence",
            EventType::DeleteSequence => "DeleteSequence",
        }
    }

    /// The kind of target events of this type must carry
    pub fn target_kind(&self) -> TargetKind {
        match self {
            EventType::CreateRepo => TargetKind::Repo,
            EventType::CreateOtu
            | EventType::CreatePlan
            | EventType::SetRepresentativeIsolate
            | EventType::UpdateExcludedAccessions => TargetKind::Otu,
            EventType::CreateIsolate
            | EventType::RenameIsolate
            | EventType::DeleteIsolate
            | EventType::LinkSequence
            | EventType::UnlinkSequence => TargetKind::Isolate,
            EventType::CreateSequence | EventType::DeleteSequence => TargetKind::Sequence,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRepoData {
    pub id: Uuid,
    pub data_type: DataType,
    pub name: String,
    pub organism: String,
    #[serde(default)]
    pub settings: RepoSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOtuData {
    pub id: Uuid,
    pub acronym: String,
    #[serde(default)]
    pub legacy_id: Option<String>,
    pub molecule: Molecule,
    pub name: String,
    pub taxid: u32,
    pub plan: Plan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlanData {
    pub plan: Plan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRepresentativeIsolateData {
    pub isolate_id: Uuid,
}

/// Adds accessions to the excluded set, or removes them when `allow` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateExcludedAccessionsData {
    pub accessions: BTreeSet<String>,
    #[serde(default)]
    pub allow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIsolateData {
    pub id: Uuid,
    #[serde(default)]
    pub legacy_id: Option<String>,
    #[serde(default)]
    pub name: Option<IsolateName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameIsolateData {
    pub name: IsolateName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteIsolateData {
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSequenceData {
    pub sequence_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkSequenceData {
    pub sequence_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequenceData {
    pub id: Uuid,
    pub accession: Accession,
    pub definition: String,
    #[serde(default)]
    pub legacy_id: Option<String>,
    pub segment: Uuid,
    pub sequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSequenceData {
    #[serde(default)]
    pub replacement: Option<Uuid>,
    #[serde(default)]
    pub rationale: String,
}

/// The closed set of event payloads
///
/// Serializes as the bare `data` object; the discriminant travels separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    CreateRepo(CreateRepoData),
    CreateOtu(CreateOtuData),
    CreatePlan(CreatePlanData),
    SetRepresentativeIsolate(SetRepresentativeIsolateData),
    UpdateExcludedAccessions(UpdateExcludedAccessionsData),
    CreateIsolate(CreateIsolateData),
    RenameIsolate(RenameIsolateData),
    DeleteIsolate(DeleteIsolateData),
    LinkSequence(LinkSequenceData),
    UnlinkSequence(UnlinkSequenceData),
    CreateSequence(CreateSequenceData),
    DeleteSequence(DeleteSequenceData),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::CreateRepo(_) => EventType::CreateRepo,
            EventPayload::CreateOtu(_) => EventType::CreateOtu,
            EventPayload::CreatePlan(_) => EventType::CreatePlan,
            EventPayload::SetRepresentativeIsolate(_) => EventType::SetRepresentativeIsolate,
            EventPayload::UpdateExcludedAccessions(_) => EventType::UpdateExcludedAccessions,
            EventPayload::CreateIsolate(_) => EventType::CreateIsolate,
            EventPayload::RenameIsolate(_) => EventType::RenameIsolate,
            EventPayload::DeleteIsolate(_) => EventType::DeleteIsolate,
            EventPayload::LinkSequence(_) => EventType::LinkSequence,
            EventPayload::UnlinkSequence(_) => EventType::UnlinkSequence,
            EventPayload::CreateSequence(_) => EventType::CreateSequence,
            EventPayload::DeleteSequence(_) => EventType::DeleteSequence,
        }
    }

    /// Check that `target` is the kind of resource this payload applies to
    pub fn check_target(&self, target: &Target) -> Result<(), EventError> {
        let event_type = self.event_type();
        let expected = event_type.target_kind();
        let found = target.kind();
        if expected == found {
            Ok(())
        } else {
            Err(EventError::TargetMismatch {
                event_type,
                expected,
                found,
            })
        }
    }

    fn from_value(
        id: u64,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<Self, EventError> {
        let payload = match event_type {
            EventType::CreateRepo => serde_json::from_value(data).map(EventPayload::CreateRepo),
            EventType::CreateOtu => serde_json::from_value(data).map(EventPayload::CreateOtu),
            EventType::CreatePlan => serde_json::from_value(data).map(EventPayload::CreatePlan),
            EventType::SetRepresentativeIsolate => {
                serde_json::from_value(data).map(EventPayload::SetRepresentativeIsolate)
            }
            EventType::UpdateExcludedAccessions => {
                serde_json::from_value(data).map(EventPayload::UpdateExcludedAccessions)
            }
            EventType::CreateIsolate => {
                serde_json::from_value(data).map(EventPayload::CreateIsolate)
            }
            EventType::RenameIsolate => {
                serde_json::from_value(data).map(EventPayload::RenameIsolate)
            }
            EventType::DeleteIsolate => {
                serde_json::from_value(data).map(EventPayload::DeleteIsolate)
            }
            EventType::LinkSequence => serde_json::from_value(data).map(EventPayload::LinkSequence),
            EventType::UnlinkSequence => {
                serde_json::from_value(data).map(EventPayload::UnlinkSequence)
            }
            EventType::CreateSequence => {
                serde_json::from_value(data).map(EventPayload::CreateSequence)
            }
            EventType::DeleteSequence => {
                serde_json::from_value(data).map(EventPayload::DeleteSequence)
            }
        };

        payload.map_err(|source| EventError::Payload {
            id,
            event_type,
            source,
        })
    }
}

/// Serialized form of an event as stored in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub query: Target,
    pub timestamp: DateTime<Utc>,
}

/// An immutable, typed event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
    pub target: Target,
}

impl Event {
    /// Build an event, rejecting a target of the wrong kind
    pub fn new(
        id: u64,
        timestamp: DateTime<Utc>,
        payload: EventPayload,
        target: Target,
    ) -> Result<Self, EventError> {
        payload.check_target(&target)?;
        Ok(Self {
            id,
            timestamp,
            payload,
            target,
        })
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn to_record(&self) -> Result<EventRecord, EventError> {
        Ok(EventRecord {
            id: self.id,
            event_type: self.event_type(),
            data: serde_json::to_value(&self.payload)?,
            query: self.target,
            timestamp: self.timestamp,
        })
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = EventError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let payload = EventPayload::from_value(record.id, record.event_type, record.data)?;
        Event::new(record.id, record.timestamp, payload, record.query)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
