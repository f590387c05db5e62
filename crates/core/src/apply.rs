// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State transitions for OTU events
//!
//! Applying an event is pure: it consumes the aggregate and returns the next
//! one. References to isolates or sequences that no longer exist are skipped
//! with a warning so replaying history never fails on a dangling id.

use crate::event::{Event, EventPayload, EventType};
use crate::otu::{Isolate, Otu, Sequence};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when applying an event to an OTU
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("{0} cannot be applied to an existing OTU")]
    NotApplicable(EventType),
    #[error("event {event_id} ({event_type}) is missing its {field} target")]
    MissingTarget {
        event_id: u64,
        event_type: EventType,
        field: &'static str,
    },
}

impl Event {
    /// Build the initial aggregate from a `CreateOTU` event
    pub fn create_otu(&self) -> Option<Otu> {
        let EventPayload::CreateOtu(data) = &self.payload else {
            return None;
        };

        Some(Otu {
            id: data.id,
            acronym: data.acronym.clone(),
            legacy_id: data.legacy_id.clone(),
            name: data.name.clone(),
            taxid: data.taxid,
            molecule: data.molecule,
            plan: data.plan.clone(),
            representative_isolate: None,
            excluded_accessions: Default::default(),
            isolates: Vec::new(),
            sequences: Default::default(),
        })
    }

    /// Apply this event to an existing OTU
    pub fn apply(&self, mut otu: Otu) -> Result<Otu, ApplyError> {
        match &self.payload {
            EventPayload::CreateRepo(_) | EventPayload::CreateOtu(_) => {
                return Err(ApplyError::NotApplicable(self.event_type()));
            }

            EventPayload::CreatePlan(data) => {
                otu.plan = data.plan.clone();
            }

            EventPayload::SetRepresentativeIsolate(data) => {
                otu.representative_isolate = Some(data.isolate_id);
            }

            EventPayload::UpdateExcludedAccessions(data) => {
                if data.allow {
                    for accession in &data.accessions {
                        otu.excluded_accessions.remove(accession);
                    }
                } else {
                    otu.excluded_accessions
                        .extend(data.accessions.iter().cloned());
                }
            }

            EventPayload::CreateIsolate(data) => {
                if otu.get_isolate(data.id).is_some() {
                    tracing::warn!(
                        event_id = self.id,
                        isolate_id = %data.id,
                        "isolate already exists, skipping"
                    );
                } else {
                    otu.isolates
                        .push(Isolate::new(data.id, data.legacy_id.clone(), data.name.clone()));
                }
            }

            EventPayload::RenameIsolate(data) => {
                let isolate_id = self.isolate_target()?;
                match otu.get_isolate_mut(isolate_id) {
                    Some(isolate) => isolate.name = Some(data.name.clone()),
                    None => self.warn_missing("isolate", isolate_id),
                }
            }

            EventPayload::DeleteIsolate(_) => {
                let isolate_id = self.isolate_target()?;
                match otu.isolates.iter().position(|i| i.id == isolate_id) {
                    Some(index) => {
                        let removed = otu.isolates.remove(index);
                        for sequence in removed.sequences {
                            let still_linked =
                                otu.isolates.iter().any(|i| i.has_sequence(sequence.id));
                            if !still_linked {
                                otu.sequences.remove(&sequence.id);
                            }
                        }
                    }
                    None => self.warn_missing("isolate", isolate_id),
                }
            }

            EventPayload::CreateSequence(data) => {
                let sequence = Sequence {
                    id: data.id,
                    accession: data.accession.clone(),
                    definition: data.definition.clone(),
                    legacy_id: data.legacy_id.clone(),
                    segment: data.segment,
                    sequence: data.sequence.clone(),
                };
                otu.sequences.insert(sequence.id, sequence.clone());

                if let Some(isolate_id) = self.target.isolate_id() {
                    match otu.get_isolate_mut(isolate_id) {
                        Some(isolate) => isolate.sequences.push(sequence),
                        None => self.warn_missing("isolate", isolate_id),
                    }
                }
            }

            EventPayload::LinkSequence(data) => {
                let isolate_id = self.isolate_target()?;
                let Some(sequence) = otu.sequences.get(&data.sequence_id).cloned() else {
                    self.warn_missing("sequence", data.sequence_id);
                    return Ok(otu);
                };
                match otu.get_isolate_mut(isolate_id) {
                    Some(isolate) if isolate.has_sequence(sequence.id) => {}
                    Some(isolate) => isolate.sequences.push(sequence),
                    None => self.warn_missing("isolate", isolate_id),
                }
            }

            EventPayload::UnlinkSequence(data) => {
                let isolate_id = self.isolate_target()?;
                match otu.get_isolate_mut(isolate_id) {
                    Some(isolate) => isolate.sequences.retain(|s| s.id != data.sequence_id),
                    None => self.warn_missing("isolate", isolate_id),
                }
            }

            EventPayload::DeleteSequence(_) => {
                let sequence_id = self.target.sequence_id().ok_or(ApplyError::MissingTarget {
                    event_id: self.id,
                    event_type: self.event_type(),
                    field: "sequence_id",
                })?;
                if otu.sequences.remove(&sequence_id).is_none() {
                    self.warn_missing("sequence", sequence_id);
                }
                for isolate in &mut otu.isolates {
                    isolate.sequences.retain(|s| s.id != sequence_id);
                }
            }
        }

        Ok(otu)
    }

    fn isolate_target(&self) -> Result<Uuid, ApplyError> {
        self.target.isolate_id().ok_or(ApplyError::MissingTarget {
            event_id: self.id,
            event_type: self.event_type(),
            field: "isolate_id",
        })
    }

    fn warn_missing(&self, kind: &'static str, id: Uuid) {
        tracing::warn!(
            event_id = self.id,
            event_type = %self.event_type(),
            kind,
            %id,
            "event references a missing resource, skipping"
        );
    }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
