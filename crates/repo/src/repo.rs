// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository facade
//!
//! Owns the event log, the derived index and the lock. Every write goes
//! through a transaction: events are appended as they are produced, and the
//! touched OTUs are rehydrated and validated before the `head` file moves.
//! Anything that fails is pruned back out of the log.

use crate::config::{RepoConfig, CONFIG_FILE};
use crate::error::RepoError;
use crate::lock::Lock;
use crate::transaction::{Outcome, Transaction};
use rb_core::{
    rehydrate, validate, Accession, Clock, CreateIsolateData, CreateOtuData, CreatePlanData,
    CreateRepoData, CreateSequenceData, DataType, DeleteIsolateData, DeleteSequenceData, Event,
    EventPayload, IdGen, Isolate, IsolateName, LinkSequenceData, Molecule, Otu, OtuMinimal, Plan,
    RenameIsolateData, RepoMeta, RepoSettings, Sequence, SetRepresentativeIsolateData,
    SystemClock, Target, UnlinkSequenceData, UpdateExcludedAccessionsData, UuidIdGen,
};
use rb_storage::{EventLog, Index, IndexError, LogError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const EVENTS_FILE: &str = "src/events.jsonl";
const CACHE_DIR: &str = ".cache";
const HEAD_FILE: &str = "head";
const GITIGNORE_FILE: &str = ".gitignore";
const GITIGNORE: &str = ".cache\nlock\n";

/// Parameters for a new repository
#[derive(Debug, Clone, PartialEq)]
pub struct NewRepo {
    pub data_type: DataType,
    pub name: String,
    pub organism: String,
    pub settings: RepoSettings,
}

impl NewRepo {
    pub fn new(data_type: DataType, name: impl Into<String>, organism: impl Into<String>) -> Self {
        Self {
            data_type,
            name: name.into(),
            organism: organism.into(),
            settings: RepoSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RepoSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Fields of a sequence to be added to an OTU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSequence {
    /// Versioned accession, e.g. `MN908947.3`
    pub accession: String,
    pub definition: String,
    pub legacy_id: Option<String>,
    pub segment: Uuid,
    pub sequence: String,
}

/// An event-sourced OTU repository on disk
pub struct Repo<C: Clock = SystemClock, G: IdGen = UuidIdGen> {
    root: PathBuf,
    config: RepoConfig,
    log: EventLog,
    index: Index,
    lock: Lock,
    meta: RepoMeta,
    transaction: Option<Transaction>,
    clock: C,
    id_gen: G,
}

impl Repo {
    /// Create a repository in an empty or missing directory
    pub fn new(path: &Path, new: NewRepo) -> Result<Self, RepoError> {
        Self::new_with(path, new, RepoConfig::default(), SystemClock, UuidIdGen)
    }

    /// Open an existing repository, reading `config.toml` if present
    pub fn open(path: &Path) -> Result<Self, RepoError> {
        let config = RepoConfig::load(path)?;
        Self::open_with(path, config, SystemClock, UuidIdGen)
    }
}

/// Open the repository at `path` and take its lock
pub fn locked_repo(path: &Path) -> Result<Repo, RepoError> {
    let mut repo = Repo::open(path)?;
    repo.lock()?;
    Ok(repo)
}

impl<C: Clock, G: IdGen> Repo<C, G> {
    pub fn new_with(
        path: &Path,
        new: NewRepo,
        config: RepoConfig,
        clock: C,
        id_gen: G,
    ) -> Result<Self, RepoError> {
        if path.is_dir() && fs::read_dir(path)?.next().is_some() {
            return Err(RepoError::InvalidInput(format!(
                "directory is not empty: {}",
                path.display()
            )));
        }
        fs::create_dir_all(path)?;
        fs::write(path.join(GITIGNORE_FILE), GITIGNORE)?;
        fs::write(path.join(CONFIG_FILE), toml::to_string(&config).map_err(invalid)?)?;

        let mut log = EventLog::open(&path.join(EVENTS_FILE))?.with_sync_writes(config.sync_writes);

        let repository_id = id_gen.next();
        let created_at = clock.now();
        let event = log.append_with_timestamp(
            EventPayload::CreateRepo(CreateRepoData {
                id: repository_id,
                data_type: new.data_type,
                name: new.name.clone(),
                organism: new.organism.clone(),
                settings: new.settings.clone(),
            }),
            Target::Repo { repository_id },
            created_at,
        )?;

        let mut index = Index::open(&path.join(CACHE_DIR))?;
        index.advance(event.id);
        index.flush()?;
        write_head(path, event.id)?;

        tracing::info!(
            path = %path.display(),
            %repository_id,
            name = %new.name,
            "created repository"
        );

        Ok(Self {
            root: path.to_path_buf(),
            config,
            log,
            index,
            lock: Lock::new(path),
            meta: RepoMeta {
                id: repository_id,
                created_at,
                data_type: new.data_type,
                name: new.name,
                organism: new.organism,
                settings: new.settings,
            },
            transaction: None,
            clock,
            id_gen,
        })
    }

    /// Open an existing repository with explicit collaborators
    ///
    /// Events past the committed `head` are left over from an interrupted
    /// transaction and are pruned. The index is rebuilt if it does not match
    /// the log.
    pub fn open_with(
        path: &Path,
        config: RepoConfig,
        clock: C,
        id_gen: G,
    ) -> Result<Self, RepoError> {
        let events_path = path.join(EVENTS_FILE);
        if !events_path.is_file() {
            return Err(RepoError::NotARepository(path.display().to_string()));
        }

        let mut log = EventLog::open(&events_path)?.with_sync_writes(config.sync_writes);
        let mut index = Index::open(&path.join(CACHE_DIR))?;

        let last_id = log.last_id();
        let head = match read_head(path)? {
            Some(head) => head,
            None => {
                tracing::warn!(last_id, "head file missing, trusting event log");
                write_head(path, last_id)?;
                last_id
            }
        };

        if head > last_id {
            return Err(RepoError::StorageCorruption {
                line: last_id + 1,
                reason: format!("head points at event {head} past the end of the log"),
            });
        }
        if head < last_id {
            let removed = log.prune(head)?;
            index.prune(head)?;
            tracing::warn!(head, last_id, removed, "pruned uncommitted events");
        }

        let first = match log.read(1) {
            Ok(event) => event,
            Err(LogError::NotFound(_)) => {
                return Err(RepoError::NotARepository(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = match first.payload {
            EventPayload::CreateRepo(data) => RepoMeta {
                id: data.id,
                created_at: first.timestamp,
                data_type: data.data_type,
                name: data.name,
                organism: data.organism,
                settings: data.settings,
            },
            other => {
                return Err(RepoError::StorageCorruption {
                    line: 1,
                    reason: format!("first event is {}, expected CreateRepo", other.event_type()),
                });
            }
        };

        if index.is_empty() || index.at_event() != log.last_id() {
            tracing::info!(
                at_event = index.at_event(),
                last_id = log.last_id(),
                "index out of date, rebuilding"
            );
            index.rebuild(&log)?;
            index.flush()?;
        }

        tracing::debug!(path = %path.display(), last_id = log.last_id(), "opened repository");

        Ok(Self {
            root: path.to_path_buf(),
            config,
            log,
            index,
            lock: Lock::new(path),
            meta,
            transaction: None,
            clock,
            id_gen,
        })
    }

    pub fn meta(&self) -> &RepoMeta {
        &self.meta
    }

    pub fn settings(&self) -> &RepoSettings {
        &self.meta.settings
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Id of the newest event in the log, committed or not
    pub fn last_id(&self) -> u64 {
        self.log.last_id()
    }

    /// Id of the newest committed event
    pub fn head_id(&self) -> Result<u64, RepoError> {
        Ok(read_head(&self.root)?.unwrap_or(0))
    }

    pub fn lock(&mut self) -> Result<(), RepoError> {
        self.lock.acquire()
    }

    pub fn unlock(&mut self) -> Result<(), RepoError> {
        if self.transaction.is_some() {
            return Err(RepoError::TransactionExists);
        }
        self.lock.release()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Run `f` as a transaction
    ///
    /// Returns `Outcome::Aborted` when `f` called [`Repo::abort`]. Any other
    /// error, including a validation failure at commit, is returned after the
    /// log and index have been rolled back.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<Outcome<T>, RepoError>
    where
        F: FnOnce(&mut Self) -> Result<T, RepoError>,
    {
        if self.transaction.is_some() {
            return Err(RepoError::TransactionExists);
        }
        if !self.lock.is_held() {
            return Err(RepoError::LockRequired);
        }

        let start_id = self.log.last_id();
        self.transaction = Some(Transaction::new(start_id));
        tracing::debug!(start_id, "began transaction");

        let result = f(self);
        let tx = self
            .transaction
            .take()
            .unwrap_or_else(|| Transaction::new(start_id));

        match (result, tx.abort_reason.clone()) {
            (result, Some(reason)) => {
                if let Err(e) = result {
                    if !matches!(e, RepoError::Aborted { .. }) {
                        tracing::warn!(?e, "error after abort");
                    }
                }
                self.rollback(start_id)?;
                tracing::info!(start_id, %reason, "transaction aborted");
                Ok(Outcome::Aborted { reason })
            }
            (Err(RepoError::Aborted { reason }), None) => {
                self.rollback(start_id)?;
                tracing::info!(start_id, %reason, "transaction aborted");
                Ok(Outcome::Aborted { reason })
            }
            (Err(e), None) => {
                if let Err(rollback_err) = self.rollback(start_id) {
                    tracing::error!(?rollback_err, "rollback failed");
                }
                Err(e)
            }
            (Ok(value), None) => {
                self.commit(tx)?;
                Ok(Outcome::Committed(value))
            }
        }
    }

    /// Mark the active transaction aborted
    ///
    /// Returns the error for the transaction body to propagate. Later writes
    /// in the same transaction fail with it too.
    pub fn abort(&mut self, reason: impl Into<String>) -> RepoError {
        let reason = reason.into();
        if let Some(tx) = self.transaction.as_mut() {
            tx.abort_reason.get_or_insert_with(|| reason.clone());
        }
        RepoError::Aborted { reason }
    }

    fn commit(&mut self, tx: Transaction) -> Result<(), RepoError> {
        let checked = self.check_affected(&tx.affected);
        let otus = match checked {
            Ok(otus) => otus,
            Err(e) => {
                if let Err(rollback_err) = self.rollback(tx.start_id) {
                    tracing::error!(?rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };

        let last_id = self.log.last_id();
        write_head(&self.root, last_id)?;

        for otu in &otus {
            self.index.upsert_otu(otu);
            if self.config.snapshot_cache {
                if let Err(e) = self.index.upsert_snapshot(otu, last_id) {
                    tracing::warn!(?e, otu_id = %otu.id, "failed to write snapshot");
                }
            }
        }
        self.index.advance(last_id);
        self.index.flush()?;

        tracing::info!(
            start_id = tx.start_id,
            last_id,
            events = last_id - tx.start_id,
            otus = otus.len(),
            "committed transaction"
        );
        Ok(())
    }

    fn check_affected(&self, affected: &BTreeSet<Uuid>) -> Result<Vec<Otu>, RepoError> {
        let mut otus = Vec::with_capacity(affected.len());
        for otu_id in affected {
            let otu = self.rehydrate_from_log(*otu_id)?;
            let issues = validate(&otu);
            if !issues.is_empty() {
                tracing::warn!(%otu_id, issues = issues.len(), "OTU failed validation");
                return Err(RepoError::InvariantViolation {
                    otu_id: *otu_id,
                    issues,
                });
            }
            otus.push(otu);
        }
        Ok(otus)
    }

    fn rollback(&mut self, start_id: u64) -> Result<(), RepoError> {
        let removed = self.log.prune(start_id)?;
        self.index.prune(start_id)?;
        self.index.flush()?;
        tracing::info!(start_id, removed, "rolled back transaction");
        Ok(())
    }

    fn require_transaction(&self) -> Result<(), RepoError> {
        match &self.transaction {
            None => Err(RepoError::TransactionRequired),
            Some(tx) => match &tx.abort_reason {
                Some(reason) => Err(RepoError::Aborted {
                    reason: reason.clone(),
                }),
                None => Ok(()),
            },
        }
    }

    fn write_event(&mut self, payload: EventPayload, target: Target) -> Result<Event, RepoError> {
        self.require_transaction()?;

        let event = self
            .log
            .append_with_timestamp(payload, target, self.clock.now())?;
        self.index.record_event(&event);

        if let (Some(tx), Some(otu_id)) = (self.transaction.as_mut(), target.otu_id()) {
            tx.affected.insert(otu_id);
        }

        tracing::debug!(
            event_id = event.id,
            event_type = %event.event_type(),
            "wrote event"
        );
        Ok(event)
    }

    fn rehydrate_from_log(&self, otu_id: Uuid) -> Result<Otu, RepoError> {
        let item = self
            .index
            .event_ids_for(otu_id)
            .ok_or_else(|| RepoError::not_found("OTU", otu_id))?;

        let events = item
            .event_ids
            .iter()
            .map(|id| self.log.read(*id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rehydrate(&events)?)
    }

    /// Current state of an OTU that must exist
    fn require_otu(&self, otu_id: Uuid) -> Result<Otu, RepoError> {
        if !self.index.contains_otu(otu_id) {
            return Err(RepoError::not_found("OTU", otu_id));
        }
        self.rehydrate_from_log(otu_id)
    }

    // Writes

    pub fn create_otu(
        &mut self,
        acronym: &str,
        legacy_id: Option<&str>,
        molecule: Molecule,
        name: &str,
        plan: Plan,
        taxid: u32,
    ) -> Result<Otu, RepoError> {
        self.require_transaction()?;
        plan.check_naming()?;

        if self.index.lookup_by_taxid(taxid).is_some() {
            return Err(RepoError::duplicate("taxid", taxid));
        }
        if self.index.lookup_by_name(name).is_some() {
            return Err(RepoError::duplicate("OTU name", name));
        }
        if let Some(legacy_id) = legacy_id {
            if self.index.lookup_by_legacy_id(legacy_id).is_some() {
                return Err(RepoError::duplicate("legacy id", legacy_id));
            }
        }

        let otu_id = self.id_gen.next();
        self.write_event(
            EventPayload::CreateOtu(CreateOtuData {
                id: otu_id,
                acronym: acronym.to_string(),
                legacy_id: legacy_id.map(str::to_string),
                molecule,
                name: name.to_string(),
                taxid,
                plan,
            }),
            Target::Otu { otu_id },
        )?;

        let otu = self.rehydrate_from_log(otu_id)?;
        self.index.upsert_otu(&otu);

        tracing::info!(%otu_id, taxid, name, "created OTU");
        Ok(otu)
    }

    pub fn create_isolate(
        &mut self,
        otu_id: Uuid,
        legacy_id: Option<&str>,
        name: Option<IsolateName>,
    ) -> Result<Isolate, RepoError> {
        self.require_transaction()?;
        let otu = self.require_otu(otu_id)?;

        if let Some(name) = &name {
            if otu.get_isolate_id_by_name(name).is_some() {
                return Err(RepoError::duplicate("isolate name", name));
            }
        }

        let isolate_id = self.id_gen.next();
        let isolate = Isolate::new(isolate_id, legacy_id.map(str::to_string), name.clone());
        self.write_event(
            EventPayload::CreateIsolate(CreateIsolateData {
                id: isolate_id,
                legacy_id: isolate.legacy_id.clone(),
                name,
            }),
            Target::Isolate { otu_id, isolate_id },
        )?;

        tracing::debug!(%otu_id, %isolate_id, "created isolate");
        Ok(isolate)
    }

    pub fn rename_isolate(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
        name: IsolateName,
    ) -> Result<(), RepoError> {
        self.require_transaction()?;
        let otu = self.require_otu(otu_id)?;

        if otu.get_isolate(isolate_id).is_none() {
            return Err(RepoError::not_found("isolate", isolate_id));
        }
        match otu.get_isolate_id_by_name(&name) {
            Some(existing) if existing == isolate_id => return Ok(()),
            Some(_) => return Err(RepoError::duplicate("isolate name", &name)),
            None => {}
        }

        self.write_event(
            EventPayload::RenameIsolate(RenameIsolateData { name }),
            Target::Isolate { otu_id, isolate_id },
        )?;
        Ok(())
    }

    /// Delete an isolate and every sequence only it links to
    pub fn delete_isolate(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
        rationale: &str,
    ) -> Result<(), RepoError> {
        self.require_transaction()?;
        let otu = self.require_otu(otu_id)?;

        if otu.get_isolate(isolate_id).is_none() {
            return Err(RepoError::not_found("isolate", isolate_id));
        }
        if otu.representative_isolate == Some(isolate_id) {
            return Err(RepoError::InvalidInput(format!(
                "isolate {isolate_id} is the representative isolate"
            )));
        }

        self.write_event(
            EventPayload::DeleteIsolate(DeleteIsolateData {
                rationale: rationale.to_string(),
            }),
            Target::Isolate { otu_id, isolate_id },
        )?;

        tracing::info!(%otu_id, %isolate_id, rationale, "deleted isolate");
        Ok(())
    }

    /// Add a sequence to an OTU, linking it to `isolate_id` when given
    pub fn create_sequence(
        &mut self,
        otu_id: Uuid,
        isolate_id: Option<Uuid>,
        new: NewSequence,
    ) -> Result<Sequence, RepoError> {
        self.require_transaction()?;
        let accession: Accession = new.accession.parse()?;
        let otu = self.require_otu(otu_id)?;

        if let Some(isolate_id) = isolate_id {
            if otu.get_isolate(isolate_id).is_none() {
                return Err(RepoError::not_found("isolate", isolate_id));
            }
        }
        if otu.plan.get_segment(new.segment).is_none() {
            return Err(RepoError::not_found("segment", new.segment));
        }
        if otu.get_sequence_by_accession(&accession.key).is_some() {
            return Err(RepoError::duplicate("accession", &accession));
        }

        let sequence_id = self.id_gen.next();
        let sequence = self.write_sequence(otu_id, isolate_id, sequence_id, accession, new)?;

        tracing::debug!(%otu_id, %sequence_id, accession = %sequence.accession, "created sequence");
        Ok(sequence)
    }

    fn write_sequence(
        &mut self,
        otu_id: Uuid,
        isolate_id: Option<Uuid>,
        sequence_id: Uuid,
        accession: Accession,
        new: NewSequence,
    ) -> Result<Sequence, RepoError> {
        let sequence = Sequence {
            id: sequence_id,
            accession,
            definition: new.definition,
            legacy_id: new.legacy_id,
            segment: new.segment,
            sequence: new.sequence,
        };

        self.write_event(
            EventPayload::CreateSequence(CreateSequenceData {
                id: sequence.id,
                accession: sequence.accession.clone(),
                definition: sequence.definition.clone(),
                legacy_id: sequence.legacy_id.clone(),
                segment: sequence.segment,
                sequence: sequence.sequence.clone(),
            }),
            Target::Sequence {
                otu_id,
                isolate_id,
                sequence_id,
            },
        )?;
        Ok(sequence)
    }

    /// Link an existing sequence to an isolate
    ///
    /// Returns `None` without writing when the sequence is already linked or
    /// the isolate already has a sequence for that segment.
    pub fn link_sequence(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
        sequence_id: Uuid,
    ) -> Result<Option<Sequence>, RepoError> {
        self.require_transaction()?;
        let otu = self.require_otu(otu_id)?;

        let isolate = otu
            .get_isolate(isolate_id)
            .ok_or_else(|| RepoError::not_found("isolate", isolate_id))?;
        let sequence = otu
            .get_sequence(sequence_id)
            .ok_or_else(|| RepoError::not_found("sequence", sequence_id))?;

        if isolate.has_sequence(sequence_id) {
            tracing::warn!(%isolate_id, %sequence_id, "sequence already linked");
            return Ok(None);
        }
        if isolate.sequences.iter().any(|s| s.segment == sequence.segment) {
            tracing::warn!(
                %isolate_id,
                %sequence_id,
                segment = %sequence.segment,
                "isolate already has a sequence for this segment"
            );
            return Ok(None);
        }

        let sequence = sequence.clone();
        self.write_event(
            EventPayload::LinkSequence(LinkSequenceData { sequence_id }),
            Target::Isolate { otu_id, isolate_id },
        )?;
        Ok(Some(sequence))
    }

    /// Swap a linked sequence for a new one and delete the old
    ///
    /// The new accession may reuse the replaced sequence's key with a higher
    /// version.
    pub fn replace_sequence(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
        new: NewSequence,
        replaced_sequence_id: Uuid,
        rationale: &str,
    ) -> Result<Sequence, RepoError> {
        self.require_transaction()?;
        let accession: Accession = new.accession.parse()?;
        let otu = self.require_otu(otu_id)?;

        let isolate = otu
            .get_isolate(isolate_id)
            .ok_or_else(|| RepoError::not_found("isolate", isolate_id))?;
        let replaced = isolate
            .get_sequence(replaced_sequence_id)
            .ok_or_else(|| RepoError::not_found("sequence", replaced_sequence_id))?;

        if otu.plan.get_segment(new.segment).is_none() {
            return Err(RepoError::not_found("segment", new.segment));
        }
        if let Some(existing) = otu.get_sequence_by_accession(&accession.key) {
            let upgrade = existing.id == replaced.id && accession.version > existing.accession.version;
            if !upgrade {
                return Err(RepoError::duplicate("accession", &accession));
            }
        }
        let replaced_accession = replaced.accession.clone();

        let sequence_id = self.id_gen.next();
        let sequence = self.write_sequence(otu_id, None, sequence_id, accession, new)?;

        self.write_event(
            EventPayload::UnlinkSequence(UnlinkSequenceData {
                sequence_id: replaced_sequence_id,
            }),
            Target::Isolate { otu_id, isolate_id },
        )?;
        self.write_event(
            EventPayload::LinkSequence(LinkSequenceData { sequence_id }),
            Target::Isolate { otu_id, isolate_id },
        )?;
        self.write_event(
            EventPayload::DeleteSequence(DeleteSequenceData {
                replacement: Some(sequence_id),
                rationale: rationale.to_string(),
            }),
            Target::Sequence {
                otu_id,
                isolate_id: Some(isolate_id),
                sequence_id: replaced_sequence_id,
            },
        )?;

        tracing::info!(
            %otu_id,
            %isolate_id,
            replaced = %replaced_accession,
            replacement = %sequence.accession,
            "replaced sequence"
        );
        Ok(sequence)
    }

    pub fn set_representative_isolate(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
    ) -> Result<(), RepoError> {
        self.require_transaction()?;
        let otu = self.require_otu(otu_id)?;

        if otu.get_isolate(isolate_id).is_none() {
            return Err(RepoError::not_found("isolate", isolate_id));
        }

        self.write_event(
            EventPayload::SetRepresentativeIsolate(SetRepresentativeIsolateData { isolate_id }),
            Target::Otu { otu_id },
        )?;
        Ok(())
    }

    pub fn exclude_accession(
        &mut self,
        otu_id: Uuid,
        accession: &str,
    ) -> Result<BTreeSet<String>, RepoError> {
        self.exclude_accessions(otu_id, [accession])
    }

    /// Exclude accessions from an OTU by key
    ///
    /// Keys already excluded are ignored and keys of sequences currently in
    /// the OTU are skipped. No event is written when nothing is left.
    /// Returns the excluded set afterwards.
    pub fn exclude_accessions<I, S>(
        &mut self,
        otu_id: Uuid,
        accessions: I,
    ) -> Result<BTreeSet<String>, RepoError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.require_transaction()?;
        let keys = accession_keys(accessions)?;
        let otu = self.require_otu(otu_id)?;
        let present = otu.accessions();

        let mut excluded = otu.excluded_accessions;
        let mut added = BTreeSet::new();
        for key in keys {
            if present.contains(&key) {
                tracing::warn!(%otu_id, accession = %key, "accession is in the OTU, not excluding");
            } else if !excluded.contains(&key) {
                added.insert(key);
            }
        }

        if added.is_empty() {
            tracing::debug!(%otu_id, "no new accessions to exclude");
            return Ok(excluded);
        }

        self.write_event(
            EventPayload::UpdateExcludedAccessions(UpdateExcludedAccessionsData {
                accessions: added.clone(),
                allow: false,
            }),
            Target::Otu { otu_id },
        )?;

        tracing::info!(%otu_id, count = added.len(), "excluded accessions");
        excluded.extend(added);
        Ok(excluded)
    }

    pub fn allow_accession(
        &mut self,
        otu_id: Uuid,
        accession: &str,
    ) -> Result<BTreeSet<String>, RepoError> {
        self.allow_accessions(otu_id, [accession])
    }

    /// Remove accessions from an OTU's excluded set
    ///
    /// Returns the excluded set afterwards.
    pub fn allow_accessions<I, S>(
        &mut self,
        otu_id: Uuid,
        accessions: I,
    ) -> Result<BTreeSet<String>, RepoError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.require_transaction()?;
        let keys = accession_keys(accessions)?;
        let otu = self.require_otu(otu_id)?;

        let mut excluded = otu.excluded_accessions;
        let allowed: BTreeSet<String> = keys
            .into_iter()
            .filter(|key| excluded.contains(key))
            .collect();

        if allowed.is_empty() {
            tracing::debug!(%otu_id, "no excluded accessions to allow");
            return Ok(excluded);
        }

        self.write_event(
            EventPayload::UpdateExcludedAccessions(UpdateExcludedAccessionsData {
                accessions: allowed.clone(),
                allow: true,
            }),
            Target::Otu { otu_id },
        )?;

        tracing::info!(%otu_id, count = allowed.len(), "allowed accessions");
        excluded.retain(|key| !allowed.contains(key));
        Ok(excluded)
    }

    /// Replace the plan of an OTU
    pub fn set_plan(&mut self, otu_id: Uuid, plan: Plan) -> Result<Plan, RepoError> {
        self.require_transaction()?;
        plan.check_naming()?;
        self.require_otu(otu_id)?;

        self.write_event(
            EventPayload::CreatePlan(CreatePlanData { plan: plan.clone() }),
            Target::Otu { otu_id },
        )?;
        Ok(plan)
    }

    // Reads

    /// Current state of an OTU
    ///
    /// Served from the snapshot cache when it is current. Inside a
    /// transaction the OTU is always rebuilt from the log.
    pub fn get_otu(&self, otu_id: Uuid) -> Result<Option<Otu>, RepoError> {
        if !self.index.contains_otu(otu_id) {
            return Ok(None);
        }

        let use_cache = self.config.snapshot_cache && self.transaction.is_none();
        let last_id = self.log.last_id();

        if use_cache {
            if let Some(otu) = self.index.load_snapshot(otu_id, last_id) {
                tracing::trace!(%otu_id, "served OTU from snapshot");
                return Ok(Some(otu));
            }
        }

        let otu = self.rehydrate_from_log(otu_id)?;

        if use_cache {
            if let Err(e) = self.index.upsert_snapshot(&otu, last_id) {
                tracing::warn!(?e, %otu_id, "failed to write snapshot");
            }
        }
        Ok(Some(otu))
    }

    pub fn get_otu_by_taxid(&self, taxid: u32) -> Result<Option<Otu>, RepoError> {
        match self.index.lookup_by_taxid(taxid) {
            Some(otu_id) => self.get_otu(otu_id),
            None => Ok(None),
        }
    }

    pub fn get_otu_by_name(&self, name: &str) -> Result<Option<Otu>, RepoError> {
        match self.index.lookup_by_name(name) {
            Some(otu_id) => self.get_otu(otu_id),
            None => Ok(None),
        }
    }

    pub fn get_otu_by_legacy_id(&self, legacy_id: &str) -> Result<Option<Otu>, RepoError> {
        match self.index.lookup_by_legacy_id(legacy_id) {
            Some(otu_id) => self.get_otu(otu_id),
            None => Ok(None),
        }
    }

    /// Resolve an OTU id from a unique prefix of at least eight characters
    pub fn get_otu_id_by_partial(&self, partial: &str) -> Result<Option<Uuid>, RepoError> {
        self.index.lookup_by_partial(partial).map_err(|e| match e {
            IndexError::PartialTooShort(_) | IndexError::PartialConflict(_) => {
                RepoError::InvalidInput(e.to_string())
            }
            other => other.into(),
        })
    }

    pub fn get_isolate(&self, isolate_id: Uuid) -> Result<Option<Isolate>, RepoError> {
        let Some(otu_id) = self.index.lookup_by_isolate_id(isolate_id) else {
            return Ok(None);
        };
        Ok(self
            .get_otu(otu_id)?
            .and_then(|otu| otu.get_isolate(isolate_id).cloned()))
    }

    /// Every OTU in the repository
    ///
    /// The set of ids is fixed when the iterator is created.
    pub fn iter_otus(&self) -> impl Iterator<Item = Result<Otu, RepoError>> + '_ {
        let otu_ids: Vec<Uuid> = self.index.otu_ids().collect();
        otu_ids.into_iter().filter_map(move |otu_id| self.get_otu(otu_id).transpose())
    }

    /// Summaries of every OTU, ordered by name
    pub fn iter_minimal_otus(&self) -> impl Iterator<Item = OtuMinimal> {
        self.index.iter_minimal_otus().into_iter()
    }

    /// Events of one OTU in log order
    pub fn iter_otu_events(
        &self,
        otu_id: Uuid,
    ) -> impl Iterator<Item = Result<Event, RepoError>> + '_ {
        let event_ids = self
            .index
            .event_ids_for(otu_id)
            .map(|item| item.event_ids)
            .unwrap_or_default();
        event_ids
            .into_iter()
            .map(move |id| self.log.read(id).map_err(RepoError::from))
    }

    pub fn get_event(&self, id: u64) -> Result<Option<Event>, RepoError> {
        match self.log.read(id) {
            Ok(event) => Ok(Some(event)),
            Err(LogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Rebuild the index and drop every snapshot
    pub fn rebuild_index(&mut self) -> Result<(), RepoError> {
        if self.transaction.is_some() {
            return Err(RepoError::TransactionExists);
        }
        self.index.rebuild(&self.log)?;
        self.index.flush()?;
        Ok(())
    }

    /// Delete the on-disk index and snapshots, then rebuild the index from
    /// the log so lookups and uniqueness checks keep answering
    pub fn clear_index(&mut self) -> Result<(), RepoError> {
        if self.transaction.is_some() {
            return Err(RepoError::TransactionExists);
        }
        self.index.clear()?;
        self.index.rebuild(&self.log)?;
        self.index.flush()?;
        Ok(())
    }
}

/// Normalize accessions to keys, accepting `KEY` or `KEY.VERSION`
fn accession_keys<I, S>(accessions: I) -> Result<BTreeSet<String>, RepoError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    accessions
        .into_iter()
        .map(|raw| -> Result<String, RepoError> {
            let raw = raw.as_ref().trim();
            if raw.contains('.') {
                return Ok(raw.parse::<Accession>()?.key);
            }
            if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(RepoError::InvalidInput(format!("invalid accession: {raw:?}")));
            }
            Ok(raw.to_string())
        })
        .collect()
}

fn read_head(root: &Path) -> Result<Option<u64>, RepoError> {
    match fs::read_to_string(root.join(HEAD_FILE)) {
        Ok(content) => content
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RepoError::StorageCorruption {
                line: 0,
                reason: format!("head file is not an event id: {:?}", content.trim()),
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_head(root: &Path, event_id: u64) -> Result<(), RepoError> {
    let path = root.join(HEAD_FILE);
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, format!("{event_id}\n"))?;
    fs::rename(&tmp_path, &path)?;
    Ok(())
}

fn invalid(e: impl std::fmt::Display) -> RepoError {
    RepoError::InvalidInput(e.to_string())
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
