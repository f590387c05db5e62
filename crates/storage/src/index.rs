// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived lookup index over the event log
//!
//! Maps each OTU to the ordered ids of its events and resolves OTUs by
//! taxonomy id, name, legacy id, isolate id or id prefix. Everything here
//! can be deleted and rebuilt from the log at any time.

use crate::log::{EventLog, LogError};
use crate::snapshot::{OtuSnapshot, SnapshotCache, SnapshotError};
use rb_core::{rehydrate, Event, EventPayload, Otu, OtuMinimal, RehydrateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Shortest id prefix accepted by [`Index::lookup_by_partial`]
pub const MIN_PARTIAL_ID_LENGTH: usize = 8;

/// Errors from index operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event log error: {0}")]
    Log(#[from] LogError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("rehydrate error for OTU {otu_id}: {source}")]
    Rehydrate {
        otu_id: Uuid,
        source: RehydrateError,
    },
    #[error("partial id {0:?} is shorter than {MIN_PARTIAL_ID_LENGTH} characters")]
    PartialTooShort(String),
    #[error("partial id {0:?} matches more than one OTU")]
    PartialConflict(String),
}

/// Event ids recorded for one OTU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIndexItem {
    pub otu_id: Uuid,
    pub event_ids: Vec<u64>,
    /// Last event id the index had seen when this item was read
    pub at_event: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct OtuEntry {
    event_ids: Vec<u64>,
    #[serde(default)]
    summary: Option<OtuMinimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolateEntry {
    otu_id: Uuid,
    event_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexData {
    version: u32,
    at_event: u64,
    otus: BTreeMap<Uuid, OtuEntry>,
    isolates: BTreeMap<Uuid, IsolateEntry>,
}

impl IndexData {
    const CURRENT_VERSION: u32 = 1;
}

impl Default for IndexData {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            at_event: 0,
            otus: BTreeMap::new(),
            isolates: BTreeMap::new(),
        }
    }
}

/// Lookup index and snapshot cache for a repository
pub struct Index {
    path: PathBuf,
    data: IndexData,
    by_name: HashMap<String, Uuid>,
    by_taxid: HashMap<u32, Uuid>,
    by_legacy_id: HashMap<String, Uuid>,
    snapshots: SnapshotCache,
    dirty: bool,
}

impl Index {
    /// Open the index stored under `cache_dir`
    ///
    /// A missing, unreadable or outdated index file yields an empty index.
    pub fn open(cache_dir: &Path) -> Result<Self, IndexError> {
        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join("index.json");

        let data = match File::open(&path) {
            Ok(file) => match serde_json::from_reader::<_, IndexData>(BufReader::new(file)) {
                Ok(data) if data.version == IndexData::CURRENT_VERSION => data,
                Ok(data) => {
                    tracing::warn!(version = data.version, "discarding outdated index");
                    IndexData::default()
                }
                Err(e) => {
                    tracing::warn!(?e, "discarding unreadable index");
                    IndexData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexData::default(),
            Err(e) => return Err(e.into()),
        };

        let mut index = Self {
            path,
            data,
            by_name: HashMap::new(),
            by_taxid: HashMap::new(),
            by_legacy_id: HashMap::new(),
            snapshots: SnapshotCache::new(&cache_dir.join("snapshots")),
            dirty: false,
        };
        index.rebuild_keys();
        Ok(index)
    }

    fn rebuild_keys(&mut self) {
        self.by_name.clear();
        self.by_taxid.clear();
        self.by_legacy_id.clear();

        for entry in self.data.otus.values() {
            if let Some(summary) = &entry.summary {
                Self::insert_keys(
                    &mut self.by_name,
                    &mut self.by_taxid,
                    &mut self.by_legacy_id,
                    summary,
                );
            }
        }
    }

    fn insert_keys(
        by_name: &mut HashMap<String, Uuid>,
        by_taxid: &mut HashMap<u32, Uuid>,
        by_legacy_id: &mut HashMap<String, Uuid>,
        summary: &OtuMinimal,
    ) {
        by_name.insert(summary.name.clone(), summary.id);
        by_taxid.insert(summary.taxid, summary.id);
        if let Some(legacy_id) = &summary.legacy_id {
            by_legacy_id.insert(legacy_id.clone(), summary.id);
        }
    }

    /// True when the index has recorded no events
    pub fn is_empty(&self) -> bool {
        self.data.at_event == 0 && self.data.otus.is_empty()
    }

    /// Id of the newest event reflected in the index
    pub fn at_event(&self) -> u64 {
        self.data.at_event
    }

    /// Record that `event` was appended to the log
    pub fn record_event(&mut self, event: &Event) {
        if let Some(otu_id) = event.target.otu_id() {
            self.data
                .otus
                .entry(otu_id)
                .or_default()
                .event_ids
                .push(event.id);

            if let EventPayload::CreateIsolate(data) = &event.payload {
                self.data.isolates.insert(
                    data.id,
                    IsolateEntry {
                        otu_id,
                        event_id: event.id,
                    },
                );
            }
        }

        self.advance(event.id);
    }

    /// Move the watermark forward without attributing an event to an OTU
    pub fn advance(&mut self, event_id: u64) {
        if event_id > self.data.at_event {
            self.data.at_event = event_id;
            self.dirty = true;
        }
    }

    /// Refresh the lookup keys of an OTU
    pub fn upsert_otu(&mut self, otu: &Otu) {
        let summary = otu.minimal();

        if let Some(previous) = self
            .data
            .otus
            .get(&otu.id)
            .and_then(|entry| entry.summary.as_ref())
        {
            self.by_name.remove(&previous.name);
            self.by_taxid.remove(&previous.taxid);
            if let Some(legacy_id) = &previous.legacy_id {
                self.by_legacy_id.remove(legacy_id);
            }
        }

        Self::insert_keys(
            &mut self.by_name,
            &mut self.by_taxid,
            &mut self.by_legacy_id,
            &summary,
        );
        self.data.otus.entry(otu.id).or_default().summary = Some(summary);
        self.dirty = true;
    }

    pub fn event_ids_for(&self, otu_id: Uuid) -> Option<EventIndexItem> {
        self.data.otus.get(&otu_id).map(|entry| EventIndexItem {
            otu_id,
            event_ids: entry.event_ids.clone(),
            at_event: self.data.at_event,
        })
    }

    pub fn contains_otu(&self, otu_id: Uuid) -> bool {
        self.data.otus.contains_key(&otu_id)
    }

    pub fn otu_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.data.otus.keys().copied()
    }

    pub fn lookup_by_taxid(&self, taxid: u32) -> Option<Uuid> {
        self.by_taxid.get(&taxid).copied()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Uuid> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_by_legacy_id(&self, legacy_id: &str) -> Option<Uuid> {
        self.by_legacy_id.get(legacy_id).copied()
    }

    /// OTU that an isolate was created in
    pub fn lookup_by_isolate_id(&self, isolate_id: Uuid) -> Option<Uuid> {
        self.data.isolates.get(&isolate_id).map(|entry| entry.otu_id)
    }

    /// Resolve a unique OTU id prefix (like git commit hashes)
    pub fn lookup_by_partial(&self, partial: &str) -> Result<Option<Uuid>, IndexError> {
        if partial.len() < MIN_PARTIAL_ID_LENGTH {
            return Err(IndexError::PartialTooShort(partial.to_string()));
        }

        let partial = partial.to_ascii_lowercase();
        let mut matches = self
            .data
            .otus
            .keys()
            .filter(|id| id.to_string().starts_with(&partial));

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(Some(*id)),
            (None, _) => Ok(None),
            (Some(_), Some(_)) => Err(IndexError::PartialConflict(partial)),
        }
    }

    /// Summaries of every indexed OTU, ordered by name
    pub fn iter_minimal_otus(&self) -> Vec<OtuMinimal> {
        let mut otus: Vec<_> = self
            .data
            .otus
            .values()
            .filter_map(|entry| entry.summary.clone())
            .collect();
        otus.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        otus
    }

    /// Forget every event with an id greater than `after_id`
    ///
    /// OTUs left without events are removed with their keys. Snapshots of
    /// every touched OTU are dropped.
    pub fn prune(&mut self, after_id: u64) -> Result<(), IndexError> {
        let mut touched = Vec::new();
        for (otu_id, entry) in self.data.otus.iter_mut() {
            let before = entry.event_ids.len();
            entry.event_ids.retain(|id| *id <= after_id);
            if entry.event_ids.len() != before {
                touched.push(*otu_id);
            }
        }

        for otu_id in &touched {
            self.snapshots.remove(*otu_id)?;
        }

        self.data.otus.retain(|_, entry| !entry.event_ids.is_empty());
        self.data
            .isolates
            .retain(|_, entry| entry.event_id <= after_id);
        self.data.at_event = self.data.at_event.min(after_id);
        self.rebuild_keys();
        self.dirty = true;

        tracing::debug!(after_id, touched = touched.len(), "pruned index");
        Ok(())
    }

    /// Discard everything and replay the whole log
    pub fn rebuild(&mut self, log: &EventLog) -> Result<(), IndexError> {
        self.clear()?;

        for event in log.iter()? {
            self.record_event(&event?);
        }

        let otu_ids: Vec<Uuid> = self.otu_ids().collect();
        for otu_id in &otu_ids {
            let otu = self.rehydrate_from_log(log, *otu_id)?;
            self.upsert_otu(&otu);
        }

        tracing::info!(
            otus = otu_ids.len(),
            at_event = self.data.at_event,
            "rebuilt index from event log"
        );
        Ok(())
    }

    fn rehydrate_from_log(&self, log: &EventLog, otu_id: Uuid) -> Result<Otu, IndexError> {
        let event_ids = self
            .data
            .otus
            .get(&otu_id)
            .map(|entry| entry.event_ids.as_slice())
            .unwrap_or_default();

        let events = event_ids
            .iter()
            .map(|id| log.read(*id))
            .collect::<Result<Vec<_>, _>>()?;

        rehydrate(&events).map_err(|source| IndexError::Rehydrate { otu_id, source })
    }

    /// Cached snapshot of an OTU, if it is still current
    ///
    /// A snapshot is current when it covers every indexed event of the OTU
    /// and does not claim events beyond `last_id`.
    pub fn load_snapshot(&self, otu_id: Uuid, last_id: u64) -> Option<Otu> {
        let newest = *self.data.otus.get(&otu_id)?.event_ids.last()?;
        let snapshot = self.snapshots.load(otu_id)?;

        if newest <= snapshot.at_event && snapshot.at_event <= last_id {
            Some(snapshot.otu)
        } else {
            tracing::debug!(
                %otu_id,
                at_event = snapshot.at_event,
                newest,
                "snapshot is stale"
            );
            None
        }
    }

    pub fn upsert_snapshot(&self, otu: &Otu, at_event: u64) -> Result<(), IndexError> {
        self.snapshots.save(&OtuSnapshot::new(otu.clone(), at_event))?;
        Ok(())
    }

    /// Persist the index if it changed
    pub fn flush(&mut self) -> Result<(), IndexError> {
        if !self.dirty {
            return Ok(());
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, &self.data)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        self.dirty = false;
        Ok(())
    }

    /// Reset to an empty index and delete cached files
    pub fn clear(&mut self) -> Result<(), IndexError> {
        self.data = IndexData::default();
        self.rebuild_keys();
        self.snapshots.clear()?;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
