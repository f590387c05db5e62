// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The OTU aggregate materialized from its events

use crate::accession::Accession;
use crate::molecule::Molecule;
use crate::plan::Plan;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Kind of isolate name, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolateNameType {
    Isolate,
    Strain,
    Clone,
    Refseq,
}

impl fmt::Display for IsolateNameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IsolateNameType::Isolate => "Isolate",
            IsolateNameType::Strain => "Strain",
            IsolateNameType::Clone => "Clone",
            IsolateNameType::Refseq => "Refseq",
        };
        f.write_str(s)
    }
}

/// A typed isolate name such as `Isolate A`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsolateName {
    #[serde(rename = "type")]
    pub name_type: IsolateNameType,
    pub value: String,
}

impl IsolateName {
    pub fn new(name_type: IsolateNameType, value: impl Into<String>) -> Self {
        Self {
            name_type,
            value: value.into(),
        }
    }
}

impl fmt::Display for IsolateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name_type, self.value)
    }
}

/// A nucleotide sequence belonging to an OTU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub accession: Accession,
    pub definition: String,
    pub legacy_id: Option<String>,
    /// Id of the plan segment this sequence fills
    pub segment: Uuid,
    pub sequence: String,
}

/// An isolate and the sequences linked to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Isolate {
    pub id: Uuid,
    pub legacy_id: Option<String>,
    pub name: Option<IsolateName>,
    pub sequences: Vec<Sequence>,
}

impl Isolate {
    pub fn new(id: Uuid, legacy_id: Option<String>, name: Option<IsolateName>) -> Self {
        Self {
            id,
            legacy_id,
            name,
            sequences: Vec::new(),
        }
    }

    pub fn accessions(&self) -> BTreeSet<String> {
        self.sequences.iter().map(|s| s.accession.key.clone()).collect()
    }

    pub fn sequence_ids(&self) -> BTreeSet<Uuid> {
        self.sequences.iter().map(|s| s.id).collect()
    }

    pub fn get_sequence(&self, sequence_id: Uuid) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == sequence_id)
    }

    pub fn has_sequence(&self, sequence_id: Uuid) -> bool {
        self.sequences.iter().any(|s| s.id == sequence_id)
    }

    /// Named isolates first, then by name type, name value and id
    pub(crate) fn sort_order(&self, other: &Self) -> Ordering {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.id.cmp(&other.id))
    }
}

/// Minimal OTU summary served straight from the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuMinimal {
    pub id: Uuid,
    pub acronym: String,
    pub legacy_id: Option<String>,
    pub name: String,
    pub taxid: u32,
}

/// An operational taxonomic unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Otu {
    pub id: Uuid,
    pub acronym: String,
    pub legacy_id: Option<String>,
    pub name: String,
    pub taxid: u32,
    pub molecule: Molecule,
    pub plan: Plan,
    pub representative_isolate: Option<Uuid>,
    pub excluded_accessions: BTreeSet<String>,
    pub isolates: Vec<Isolate>,
    /// Every sequence in the OTU by id, linked to an isolate or not
    pub sequences: BTreeMap<Uuid, Sequence>,
}

impl Otu {
    /// Keys of every accession linked to an isolate
    pub fn accessions(&self) -> BTreeSet<String> {
        self.isolates
            .iter()
            .flat_map(|i| i.sequences.iter())
            .map(|s| s.accession.key.clone())
            .collect()
    }

    /// Every linked accession with its version
    pub fn versioned_accessions(&self) -> BTreeSet<Accession> {
        self.isolates
            .iter()
            .flat_map(|i| i.sequences.iter())
            .map(|s| s.accession.clone())
            .collect()
    }

    /// Accessions that may not be added to this OTU: present or excluded
    pub fn blocked_accessions(&self) -> BTreeSet<String> {
        let mut blocked = self.accessions();
        blocked.extend(self.excluded_accessions.iter().cloned());
        blocked
    }

    pub fn isolate_ids(&self) -> BTreeSet<Uuid> {
        self.isolates.iter().map(|i| i.id).collect()
    }

    pub fn get_isolate(&self, isolate_id: Uuid) -> Option<&Isolate> {
        self.isolates.iter().find(|i| i.id == isolate_id)
    }

    pub fn get_isolate_mut(&mut self, isolate_id: Uuid) -> Option<&mut Isolate> {
        self.isolates.iter_mut().find(|i| i.id == isolate_id)
    }

    pub fn get_isolate_id_by_name(&self, name: &IsolateName) -> Option<Uuid> {
        self.isolates
            .iter()
            .find(|i| i.name.as_ref() == Some(name))
            .map(|i| i.id)
    }

    pub fn get_sequence(&self, sequence_id: Uuid) -> Option<&Sequence> {
        self.sequences.get(&sequence_id)
    }

    /// Find a sequence by accession key, linked or not
    pub fn get_sequence_by_accession(&self, key: &str) -> Option<&Sequence> {
        self.sequences.values().find(|s| s.accession.key == key)
    }

    /// Id of the isolate a sequence is linked to
    pub fn get_isolate_id_by_sequence(&self, sequence_id: Uuid) -> Option<Uuid> {
        self.isolates
            .iter()
            .find(|i| i.has_sequence(sequence_id))
            .map(|i| i.id)
    }

    /// Sequences linked to at least one isolate
    pub fn linked_sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.isolates.iter().flat_map(|i| i.sequences.iter())
    }

    pub fn minimal(&self) -> OtuMinimal {
        OtuMinimal {
            id: self.id,
            acronym: self.acronym.clone(),
            legacy_id: self.legacy_id.clone(),
            name: self.name.clone(),
            taxid: self.taxid,
        }
    }
}

#[cfg(test)]
#[path = "otu_tests.rs"]
mod tests;
