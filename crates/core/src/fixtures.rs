// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event and OTU fixtures shared by tests across the workspace

use crate::accession::Accession;
use crate::event::*;
use crate::molecule::{MolType, Molecule, Strandedness, Topology};
use crate::otu::{IsolateName, IsolateNameType};
use crate::plan::{Plan, Segment};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const REPO_ID: Uuid = Uuid::from_u128(0x1);
pub const OTU_ID: Uuid = Uuid::from_u128(0x100);
pub const PLAN_ID: Uuid = Uuid::from_u128(0x10);
pub const SEGMENT_ID: Uuid = Uuid::from_u128(0x11);

/// Length of the single segment in [`monopartite_plan`]
pub const SEGMENT_LENGTH: u64 = 150;

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn tmv_molecule() -> Molecule {
    Molecule::new(Strandedness::Single, Topology::Linear, MolType::Rna)
}

pub fn monopartite_plan() -> Plan {
    Plan::monopartite(
        PLAN_ID,
        Segment::new(SEGMENT_ID, SEGMENT_LENGTH, 0.03, None),
    )
}

/// A nucleotide string of exactly `length` bases
pub fn bases(length: usize) -> String {
    "ACGT".chars().cycle().take(length).collect()
}

pub fn isolate_name(value: &str) -> IsolateName {
    IsolateName::new(IsolateNameType::Isolate, value)
}

pub fn create_otu_data(id: Uuid, taxid: u32, name: &str) -> CreateOtuData {
    CreateOtuData {
        id,
        acronym: "TMV".to_string(),
        legacy_id: None,
        molecule: tmv_molecule(),
        name: name.to_string(),
        taxid,
        plan: monopartite_plan(),
    }
}

/// Builds a numbered stream of events for one OTU
pub struct EventStream {
    otu_id: Uuid,
    next_id: u64,
}

impl EventStream {
    /// Start numbering at `first_id`
    pub fn new(otu_id: Uuid, first_id: u64) -> Self {
        Self {
            otu_id,
            next_id: first_id,
        }
    }

    fn event(&mut self, payload: EventPayload, target: Target) -> Event {
        let id = self.next_id;
        self.next_id += 1;
        Event {
            id,
            timestamp: timestamp(),
            payload,
            target,
        }
    }

    fn otu_target(&self) -> Target {
        Target::Otu {
            otu_id: self.otu_id,
        }
    }

    fn isolate_target(&self, isolate_id: Uuid) -> Target {
        Target::Isolate {
            otu_id: self.otu_id,
            isolate_id,
        }
    }

    pub fn create_otu(&mut self) -> Event {
        self.create_otu_with(12242, "Tobacco mosaic virus")
    }

    pub fn create_otu_with(&mut self, taxid: u32, name: &str) -> Event {
        let data = create_otu_data(self.otu_id, taxid, name);
        let target = self.otu_target();
        self.event(EventPayload::CreateOtu(data), target)
    }

    pub fn create_isolate(&mut self, isolate_id: Uuid, name: Option<&str>) -> Event {
        let target = self.isolate_target(isolate_id);
        self.event(
            EventPayload::CreateIsolate(CreateIsolateData {
                id: isolate_id,
                legacy_id: None,
                name: name.map(isolate_name),
            }),
            target,
        )
    }

    pub fn rename_isolate(&mut self, isolate_id: Uuid, name: &str) -> Event {
        let target = self.isolate_target(isolate_id);
        self.event(
            EventPayload::RenameIsolate(RenameIsolateData {
                name: isolate_name(name),
            }),
            target,
        )
    }

    pub fn delete_isolate(&mut self, isolate_id: Uuid) -> Event {
        let target = self.isolate_target(isolate_id);
        self.event(
            EventPayload::DeleteIsolate(DeleteIsolateData {
                rationale: "test".to_string(),
            }),
            target,
        )
    }

    /// Create a plan-conforming sequence, linked when `isolate_id` is given
    pub fn create_sequence(
        &mut self,
        sequence_id: Uuid,
        isolate_id: Option<Uuid>,
        accession: &str,
    ) -> Event {
        let accession: Accession = accession
            .parse()
            .unwrap_or_else(|_| Accession::new(accession, 1));
        let target = Target::Sequence {
            otu_id: self.otu_id,
            isolate_id,
            sequence_id,
        };
        self.event(
            EventPayload::CreateSequence(CreateSequenceData {
                id: sequence_id,
                accession,
                definition: "Tobacco mosaic virus, complete genome".to_string(),
                legacy_id: None,
                segment: SEGMENT_ID,
                sequence: bases(SEGMENT_LENGTH as usize),
            }),
            target,
        )
    }

    pub fn link_sequence(&mut self, isolate_id: Uuid, sequence_id: Uuid) -> Event {
        let target = self.isolate_target(isolate_id);
        self.event(
            EventPayload::LinkSequence(LinkSequenceData { sequence_id }),
            target,
        )
    }

    pub fn unlink_sequence(&mut self, isolate_id: Uuid, sequence_id: Uuid) -> Event {
        let target = self.isolate_target(isolate_id);
        self.event(
            EventPayload::UnlinkSequence(UnlinkSequenceData { sequence_id }),
            target,
        )
    }

    pub fn delete_sequence(&mut self, sequence_id: Uuid, replacement: Option<Uuid>) -> Event {
        let target = Target::Sequence {
            otu_id: self.otu_id,
            isolate_id: None,
            sequence_id,
        };
        self.event(
            EventPayload::DeleteSequence(DeleteSequenceData {
                replacement,
                rationale: "test".to_string(),
            }),
            target,
        )
    }

    pub fn set_representative(&mut self, isolate_id: Uuid) -> Event {
        let target = self.otu_target();
        self.event(
            EventPayload::SetRepresentativeIsolate(SetRepresentativeIsolateData { isolate_id }),
            target,
        )
    }

    pub fn update_excluded(&mut self, accessions: &[&str], allow: bool) -> Event {
        let target = self.otu_target();
        self.event(
            EventPayload::UpdateExcludedAccessions(UpdateExcludedAccessionsData {
                accessions: accessions.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>(),
                allow,
            }),
            target,
        )
    }

    pub fn create_plan(&mut self, plan: Plan) -> Event {
        let target = self.otu_target();
        self.event(EventPayload::CreatePlan(CreatePlanData { plan }), target)
    }
}
