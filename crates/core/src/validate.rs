// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invariant checks run on an OTU before a transaction commits

use crate::otu::{IsolateName, Otu};
use crate::plan::PlanError;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("representative isolate {0} is not in the OTU")]
    RepresentativeMissing(Uuid),
    #[error("isolate name {0} is used more than once")]
    DuplicateIsolateName(IsolateName),
    #[error("accession {0} is both excluded and present")]
    ExcludedAccessionPresent(String),
    #[error("isolate {isolate_id} links unknown sequence {sequence_id}")]
    DanglingSequence { isolate_id: Uuid, sequence_id: Uuid },
    #[error("accession {0} is used by more than one sequence")]
    DuplicateAccession(String),
    #[error("sequence {accession} references segment {segment} missing from the plan")]
    UnknownSegment { accession: String, segment: Uuid },
    #[error("sequence {accession} has length {length} outside {min}..={max}")]
    LengthOutOfRange {
        accession: String,
        length: usize,
        min: u64,
        max: u64,
    },
    #[error("invalid plan: {0}")]
    Plan(PlanError),
}

/// Collect every invariant the OTU breaks
pub fn validate(otu: &Otu) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Err(e) = otu.plan.check_naming() {
        issues.push(ValidationIssue::Plan(e));
    }

    if let Some(representative) = otu.representative_isolate {
        if otu.get_isolate(representative).is_none() {
            issues.push(ValidationIssue::RepresentativeMissing(representative));
        }
    }

    let mut names = BTreeSet::new();
    for name in otu.isolates.iter().filter_map(|i| i.name.as_ref()) {
        if !names.insert(name) {
            issues.push(ValidationIssue::DuplicateIsolateName(name.clone()));
        }
    }

    let present = otu.accessions();
    for accession in otu.excluded_accessions.intersection(&present) {
        issues.push(ValidationIssue::ExcludedAccessionPresent(accession.clone()));
    }

    let mut keys = BTreeSet::new();
    for sequence in otu.sequences.values() {
        if !keys.insert(sequence.accession.key.as_str()) {
            issues.push(ValidationIssue::DuplicateAccession(
                sequence.accession.key.clone(),
            ));
        }
    }

    for isolate in &otu.isolates {
        for sequence in &isolate.sequences {
            if otu.get_sequence(sequence.id).is_none() {
                issues.push(ValidationIssue::DanglingSequence {
                    isolate_id: isolate.id,
                    sequence_id: sequence.id,
                });
                continue;
            }

            let Some(segment) = otu.plan.get_segment(sequence.segment) else {
                issues.push(ValidationIssue::UnknownSegment {
                    accession: sequence.accession.to_string(),
                    segment: sequence.segment,
                });
                continue;
            };

            if !segment.accepts_length(sequence.sequence.len()) {
                let (min, max) = segment.length_bounds();
                issues.push(ValidationIssue::LengthOutOfRange {
                    accession: sequence.accession.to_string(),
                    length: sequence.sequence.len(),
                    min,
                    max,
                });
            }
        }
    }

    issues
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
