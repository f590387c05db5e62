//! Recovery specs
//!
//! Verify that opening a repository discards uncommitted events and
//! rebuilds a missing index, and that unreadable logs fail to open.

use crate::prelude::*;
use similar_asserts::assert_eq;
use rb_core::{CreateIsolateData, EventPayload, Target};
use rb_storage::EventLog;

#[test]
fn events_past_head_are_pruned_on_open() {
    let (project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    drop(repo);
    let committed = project.log_bytes();

    let isolate_id = Uuid::new_v4();
    let mut log = EventLog::open(&project.events_file()).unwrap();
    log.append(
        EventPayload::CreateIsolate(CreateIsolateData {
            id: isolate_id,
            legacy_id: None,
            name: Some(isolate_name("interrupted")),
        }),
        Target::Isolate {
            otu_id: tmv.otu_id,
            isolate_id,
        },
    )
    .unwrap();
    drop(log);

    let repo = Repo::open(&project.path()).unwrap();
    assert_eq!(repo.last_id(), 4);
    assert_eq!(project.log_bytes(), committed);
    assert!(repo.get_isolate(isolate_id).unwrap().is_none());
}

#[test]
fn deleted_cache_is_rebuilt() {
    let (project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    drop(repo);

    std::fs::remove_dir_all(project.path().join(".cache")).unwrap();

    let repo = Repo::open(&project.path()).unwrap();
    let otu = repo.get_otu_by_name(TMV_NAME).unwrap().unwrap();
    assert_eq!(otu.id, tmv.otu_id);
    assert_eq!(otu.accessions(), keys(&["TMVABC"]));
}

#[test]
fn corrupt_record_fails_to_open() {
    let (project, mut repo) = Project::generic_viruses();
    populate_tmv(&mut repo);
    drop(repo);

    let content = std::fs::read_to_string(project.events_file()).unwrap();
    std::fs::write(project.events_file(), content.replacen("TMVABC", "TMVXYZ", 1)).unwrap();

    assert!(matches!(
        Repo::open(&project.path()),
        Err(RepoError::StorageCorruption { line: 4, .. })
    ));
}

#[test]
fn invalid_utf8_record_fails_to_open() {
    let (project, mut repo) = Project::generic_viruses();
    populate_tmv(&mut repo);
    drop(repo);

    let mut content = std::fs::read(project.events_file()).unwrap();
    content.extend_from_slice(b"\xff\xfe garbage\n");
    std::fs::write(project.events_file(), content).unwrap();

    assert!(matches!(
        Repo::open(&project.path()),
        Err(RepoError::StorageCorruption { line: 5, .. })
    ));
}

#[test]
fn cleared_index_still_rejects_duplicates() {
    let (_project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);

    repo.clear_index().unwrap();
    assert_eq!(
        repo.get_otu_by_taxid(TMV_TAXID).unwrap().map(|otu| otu.id),
        Some(tmv.otu_id)
    );

    assert!(matches!(
        repo.transaction(create_tmv),
        Err(RepoError::DuplicateResource { .. })
    ));
    assert_eq!(repo.last_id(), 4);
}
