//! Shared helpers for repository specs

#![allow(dead_code)]

pub use rb_core::fixtures::{bases, isolate_name, monopartite_plan, tmv_molecule, SEGMENT_ID};
pub use rb_core::{DataType, EventType, Otu};
pub use rb_repo::{locked_repo, NewRepo, NewSequence, Outcome, Repo, RepoError};
pub use std::collections::BTreeSet;
pub use tempfile::TempDir;
pub use uuid::Uuid;

pub const TMV_TAXID: u32 = 12242;
pub const TMV_NAME: &str = "Tobacco mosaic virus";

/// A repository in a temporary directory
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// An empty "Generic Viruses" genome repository, locked for writing
    pub fn generic_viruses() -> (Self, Repo) {
        let dir = TempDir::new().unwrap();
        let project = Self { dir };
        let mut repo = Repo::new(
            &project.path(),
            NewRepo::new(DataType::Genome, "Generic Viruses", "virus"),
        )
        .unwrap();
        repo.lock().unwrap();
        (project, repo)
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("repo")
    }

    pub fn events_file(&self) -> std::path::PathBuf {
        self.path().join("src/events.jsonl")
    }

    pub fn log_bytes(&self) -> Vec<u8> {
        std::fs::read(self.events_file()).unwrap()
    }
}

/// Ids created by [`populate_tmv`]
pub struct Tmv {
    pub otu_id: Uuid,
    pub isolate_id: Uuid,
    pub sequence_id: Uuid,
}

pub fn sequence(accession: &str) -> NewSequence {
    NewSequence {
        accession: accession.to_string(),
        definition: "Tobacco mosaic virus, complete genome".to_string(),
        legacy_id: None,
        segment: SEGMENT_ID,
        sequence: bases(150),
    }
}

pub fn create_tmv(repo: &mut Repo) -> Result<Otu, RepoError> {
    repo.create_otu(
        "TMV",
        None,
        tmv_molecule(),
        TMV_NAME,
        monopartite_plan(),
        TMV_TAXID,
    )
}

/// Create TMV (event 2), isolate A (event 3) and TMVABC.1 linked to A (event 4)
pub fn populate_tmv(repo: &mut Repo) -> Tmv {
    let otu_id = repo
        .transaction(create_tmv)
        .unwrap()
        .committed()
        .unwrap()
        .id;
    let isolate_id = repo
        .transaction(|repo| repo.create_isolate(otu_id, None, Some(isolate_name("A"))))
        .unwrap()
        .committed()
        .unwrap()
        .id;
    let sequence_id = repo
        .transaction(|repo| repo.create_sequence(otu_id, Some(isolate_id), sequence("TMVABC.1")))
        .unwrap()
        .committed()
        .unwrap()
        .id;

    Tmv {
        otu_id,
        isolate_id,
        sequence_id,
    }
}

pub fn keys(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}
