//! Accession exclusion specs
//!
//! Verify that exclusion is idempotent and never hides a present accession.

use crate::prelude::*;
use similar_asserts::assert_eq;

fn count_exclusion_events(repo: &Repo, otu_id: Uuid) -> usize {
    repo.iter_otu_events(otu_id)
        .filter(|event| {
            event.as_ref().unwrap().event_type() == EventType::UpdateExcludedAccessions
        })
        .count()
}

#[test]
fn excluding_twice_writes_one_event() {
    let (_project, mut repo) = Project::generic_viruses();
    let otu_id = repo
        .transaction(create_tmv)
        .unwrap()
        .committed()
        .unwrap()
        .id;

    for _ in 0..2 {
        repo.transaction(|repo| repo.exclude_accession(otu_id, "TMVABC.1"))
            .unwrap();
    }

    assert_eq!(count_exclusion_events(&repo, otu_id), 1);
    let otu = repo.get_otu(otu_id).unwrap().unwrap();
    assert_eq!(otu.excluded_accessions, keys(&["TMVABC"]));
}

#[test]
fn present_accession_is_not_excluded() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    let excluded = repo
        .transaction(|repo| repo.exclude_accession(tmv.otu_id, "TMVABC.1"))
        .unwrap()
        .committed()
        .unwrap();

    assert!(excluded.is_empty());
    assert_eq!(count_exclusion_events(&repo, tmv.otu_id), 0);
}

#[test]
fn allowing_restores_accession() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    repo.transaction(|repo| repo.exclude_accessions(tmv.otu_id, ["MN908947.3", "NC_001367.1"]))
        .unwrap();
    let excluded = repo
        .transaction(|repo| repo.allow_accession(tmv.otu_id, "MN908947"))
        .unwrap()
        .committed()
        .unwrap();

    assert_eq!(excluded, keys(&["NC_001367"]));
    assert_eq!(count_exclusion_events(&repo, tmv.otu_id), 2);
}
