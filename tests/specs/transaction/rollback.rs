//! Transaction rollback specs
//!
//! Verify that failed and aborted transactions leave no trace.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn duplicate_isolate_name_fails_whole_transaction() {
    let (project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    let before = project.log_bytes();

    let result = repo.transaction(|repo| {
        repo.create_isolate(tmv.otu_id, None, Some(isolate_name("A")))
    });

    assert!(result.is_err());
    assert_eq!(repo.last_id(), 4);
    assert_eq!(project.log_bytes(), before);

    let otu = repo.get_otu(tmv.otu_id).unwrap().unwrap();
    assert_eq!(otu.isolate_ids(), BTreeSet::from([tmv.isolate_id]));
}

#[test]
fn invalid_state_at_commit_is_rolled_back() {
    let (project, mut repo) = Project::generic_viruses();
    let tmv = populate_tmv(&mut repo);
    let before = project.log_bytes();

    let result = repo.transaction(|repo| {
        let isolate = repo.create_isolate(tmv.otu_id, None, Some(isolate_name("B")))?;
        let mut long = sequence("TMVDEF.1");
        long.sequence = bases(400);
        repo.create_sequence(tmv.otu_id, Some(isolate.id), long)
    });

    match result {
        Err(RepoError::InvariantViolation { otu_id, issues }) => {
            assert_eq!(otu_id, tmv.otu_id);
            assert_eq!(issues.len(), 1);
        }
        other => panic!("expected InvariantViolation, got {other:?}"),
    }
    assert_eq!(repo.last_id(), 4);
    assert_eq!(project.log_bytes(), before);
}

#[test]
fn aborted_transaction_returns_reason() {
    let (project, mut repo) = Project::generic_viruses();
    let before = project.log_bytes();

    let outcome = repo
        .transaction(|repo| {
            let otu = create_tmv(repo)?;
            repo.create_isolate(otu.id, None, Some(isolate_name("A")))?;
            Err::<(), _>(repo.abort("no usable records"))
        })
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Aborted {
            reason: "no usable records".to_string()
        }
    );
    assert_eq!(repo.last_id(), 1);
    assert_eq!(project.log_bytes(), before);
    assert!(repo.get_otu_by_taxid(TMV_TAXID).unwrap().is_none());
}

#[test]
fn writes_require_a_transaction() {
    let (_project, mut repo) = Project::generic_viruses();

    assert!(matches!(
        create_tmv(&mut repo),
        Err(RepoError::TransactionRequired)
    ));
}

#[test]
fn transactions_require_the_lock() {
    let (_project, mut repo) = Project::generic_viruses();
    repo.unlock().unwrap();

    assert!(matches!(
        repo.transaction(create_tmv),
        Err(RepoError::LockRequired)
    ));
}
