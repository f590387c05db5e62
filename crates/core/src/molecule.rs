// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Molecule descriptors for an OTU

use serde::{Deserialize, Serialize};

/// Strandedness of a molecule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strandedness {
    Single,
    Double,
}

/// Topology of a molecule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Linear,
    Circular,
}

/// In vivo molecule type, following the GenBank moltype field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MolType {
    #[serde(rename = "cRNA")]
    CRna,
    #[serde(rename = "DNA")]
    Dna,
    #[serde(rename = "mRNA")]
    MRna,
    #[serde(rename = "RNA")]
    Rna,
    #[serde(rename = "tRNA")]
    TRna,
}

/// The strandedness, molecule type and topology of an OTU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Molecule {
    pub strandedness: Strandedness,
    pub topology: Topology,
    #[serde(rename = "type")]
    pub mol_type: MolType,
}

impl Molecule {
    pub fn new(strandedness: Strandedness, topology: Topology, mol_type: MolType) -> Self {
        Self {
            strandedness,
            topology,
            mol_type,
        }
    }
}
