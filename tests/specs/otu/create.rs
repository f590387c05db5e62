//! OTU creation specs
//!
//! Verify the event sequence for building an OTU and the uniqueness of
//! OTU keys.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn building_tmv_writes_events_two_through_four() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    let types: Vec<EventType> = repo
        .iter_otu_events(tmv.otu_id)
        .map(|event| event.unwrap().event_type())
        .collect();
    assert_eq!(
        types,
        vec![
            EventType::CreateOtu,
            EventType::CreateIsolate,
            EventType::CreateSequence,
        ]
    );

    let otu = repo.get_otu_by_taxid(TMV_TAXID).unwrap().unwrap();
    assert_eq!(otu.accessions(), keys(&["TMVABC"]));
    assert_eq!(
        otu.get_isolate(tmv.isolate_id).unwrap().name,
        Some(isolate_name("A"))
    );
}

#[test]
fn duplicate_taxid_is_rejected_without_events() {
    let (project, mut repo) = Project::generic_viruses();
    populate_tmv(&mut repo);
    let before = project.log_bytes();

    let result = repo.transaction(|repo| {
        repo.create_otu(
            "ToMV",
            None,
            tmv_molecule(),
            "Tomato mosaic virus",
            monopartite_plan(),
            TMV_TAXID,
        )
    });

    assert!(matches!(result, Err(RepoError::DuplicateResource { .. })));
    assert_eq!(repo.last_id(), 4);
    assert_eq!(project.log_bytes(), before);
}

#[test]
fn duplicate_name_is_rejected_without_events() {
    let (project, mut repo) = Project::generic_viruses();
    populate_tmv(&mut repo);
    let before = project.log_bytes();

    let result = repo.transaction(|repo| {
        repo.create_otu("TMV", None, tmv_molecule(), TMV_NAME, monopartite_plan(), 1)
    });

    assert!(matches!(result, Err(RepoError::DuplicateResource { .. })));
    assert_eq!(repo.last_id(), 4);
    assert_eq!(project.log_bytes(), before);
}

#[test]
fn otu_is_found_by_id_prefix() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    let id = tmv.otu_id.to_string();

    assert_eq!(repo.get_otu_id_by_partial(&id[..8]).unwrap(), Some(tmv.otu_id));
    assert!(matches!(
        repo.get_otu_id_by_partial(&id[..4]),
        Err(RepoError::InvalidInput(_))
    ));
}
