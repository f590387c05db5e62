//! Isolate and sequence specs
//!
//! Verify cascade deletion and sequence replacement.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn deleting_isolate_removes_its_accessions() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    repo.transaction(|repo| repo.delete_isolate(tmv.otu_id, tmv.isolate_id, "bad isolate"))
        .unwrap();

    let otu = repo.get_otu(tmv.otu_id).unwrap().unwrap();
    assert!(otu.accessions().is_empty());
    assert!(otu.sequences.is_empty());
}

#[test]
fn replacing_sequence_with_newer_version() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    let outcome = repo
        .transaction(|repo| {
            repo.replace_sequence(
                tmv.otu_id,
                tmv.isolate_id,
                sequence("TMVABC.2"),
                tmv.sequence_id,
                "updated upstream",
            )
        })
        .unwrap();
    assert!(outcome.is_committed());

    let otu = repo.get_otu(tmv.otu_id).unwrap().unwrap();
    let versioned: Vec<String> = otu
        .versioned_accessions()
        .iter()
        .map(|a| a.to_string())
        .collect();
    assert_eq!(versioned, vec!["TMVABC.2".to_string()]);
    assert_eq!(otu.accessions(), keys(&["TMVABC"]));
}

#[test]
fn iter_otus_lists_every_otu() {
    let (_project, mut repo) = Project::generic_viruses();
    populate_tmv(&mut repo);
    repo.transaction(|repo| {
        repo.create_otu(
            "CMV",
            None,
            tmv_molecule(),
            "Cucumber mosaic virus",
            monopartite_plan(),
            12305,
        )
    })
    .unwrap();

    let mut names: Vec<String> = repo.iter_otus().map(|otu| otu.unwrap().name).collect();
    names.sort();
    assert_eq!(names, vec!["Cucumber mosaic virus", TMV_NAME]);
}
