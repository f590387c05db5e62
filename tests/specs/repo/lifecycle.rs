//! Repository lifecycle specs
//!
//! Verify creating, opening and locking a repository.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn new_repository_has_create_repo_event() {
    let (_project, repo) = Project::generic_viruses();

    assert_eq!(repo.last_id(), 1);
    assert_eq!(repo.meta().name, "Generic Viruses");
    assert_eq!(repo.meta().organism, "virus");

    let event = repo.get_event(1).unwrap().unwrap();
    assert_eq!(event.event_type(), EventType::CreateRepo);
}

#[test]
fn new_repository_ignores_cache_and_lock() {
    let (project, _repo) = Project::generic_viruses();

    let gitignore = std::fs::read_to_string(project.path().join(".gitignore")).unwrap();
    assert!(gitignore.lines().any(|line| line == ".cache"));
    assert!(gitignore.lines().any(|line| line == "lock"));
}

#[test]
fn reopened_repository_keeps_metadata_and_otus() {
    let (project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    let meta = repo.meta().clone();
    drop(repo);

    let repo = Repo::open(&project.path()).unwrap();
    assert_eq!(repo.meta(), &meta);
    assert_eq!(repo.last_id(), 4);
    assert_eq!(
        repo.get_otu_by_taxid(TMV_TAXID).unwrap().map(|otu| otu.id),
        Some(tmv.otu_id)
    );
}

#[test]
fn second_writer_is_locked_out() {
    let (project, _repo) = Project::generic_viruses();

    match locked_repo(&project.path()) {
        Err(RepoError::LockConflict { holder }) => {
            assert_eq!(holder, std::process::id().to_string());
        }
        Err(other) => panic!("expected LockConflict, got {other:?}"),
        Ok(_) => panic!("expected LockConflict, got a locked repository"),
    }
}

#[test]
fn lock_is_free_after_unlock() {
    let (project, mut repo) = Project::generic_viruses();
    repo.unlock().unwrap();

    let other = locked_repo(&project.path()).unwrap();
    assert!(other.is_locked());
}
