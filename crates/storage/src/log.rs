// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event log
//!
//! Events live in a single segment file, one JSON line per event. Ids are
//! strictly sequential from 1. An in-memory offset table built on open maps
//! each id to the byte offset of its line.
//!
//! ## Durability Guarantees
//!
//! - Every append is followed by `fsync()` before returning
//! - Checksums detect corruption from bit flips
//! - A gap, bad checksum or torn line makes the log unopenable
//! - [`EventLog::repair`] truncates a torn tail on request, never implicitly

use crate::entry::LogEntry;
use chrono::{DateTime, Utc};
use rb_core::{Event, EventError, EventPayload, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in event log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event error: {0}")]
    Event(#[from] EventError),
    #[error("corrupted event log at line {line}: {reason}")]
    Corruption { line: u64, reason: String },
    #[error("event {0} not found")]
    NotFound(u64),
    #[error("start id {start} is outside the log (last id {last_id})")]
    Range { start: u64, last_id: u64 },
}

/// Durable, strictly ordered store of events
pub struct EventLog {
    path: PathBuf,
    file: File,
    /// `offsets[n]` is the byte offset of event `n + 1`
    offsets: Vec<u64>,
    /// Length of the file in bytes
    len: u64,
    sync_writes: bool,
}

impl EventLog {
    /// Open or create the log at `path`
    ///
    /// Scans every line, verifying checksums and that ids run from 1
    /// without gaps.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (offsets, len) = Self::scan(path)?;

        tracing::debug!(
            path = %path.display(),
            last_id = offsets.len(),
            "opened event log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offsets,
            len,
            sync_writes: true,
        })
    }

    /// Skip `fsync` after each append
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    fn scan(path: &Path) -> Result<(Vec<u64>, u64), LogError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut offsets = Vec::new();
        let mut position = 0u64;
        let mut line_number = 0u64;
        let mut buf = Vec::new();

        loop {
            let bytes_read = read_raw_line(&mut reader, &mut buf)?;
            if bytes_read == 0 {
                break;
            }
            line_number += 1;
            let line = decode_line(&buf, line_number)?;

            if line.trim().is_empty() {
                position += bytes_read as u64;
                continue;
            }

            let expected = offsets.len() as u64 + 1;
            Self::check_line(line, expected).map_err(|reason| LogError::Corruption {
                line: line_number,
                reason,
            })?;

            offsets.push(position);
            position += bytes_read as u64;
        }

        Ok((offsets, position))
    }

    /// Validate one line holding event `expected`
    fn check_line(line: &str, expected: u64) -> Result<(), String> {
        if !line.ends_with('\n') {
            return Err("truncated line".to_string());
        }

        let entry = LogEntry::from_line(line.trim()).map_err(|e| e.to_string())?;
        if !entry.verify() {
            return Err("checksum mismatch".to_string());
        }
        if entry.id != expected {
            return Err(format!("expected event {expected}, found {}", entry.id));
        }

        Event::try_from(entry.record()).map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Truncate everything from the first invalid line onwards
    ///
    /// Returns the number of bytes removed. Used for explicit crash
    /// recovery; [`EventLog::open`] never truncates.
    pub fn repair(path: &Path) -> Result<u64, LogError> {
        if !path.exists() {
            return Ok(0);
        }

        let mut reader = BufReader::new(File::open(path)?);
        let mut last_valid_position = 0u64;
        let mut position = 0u64;
        let mut expected = 1u64;
        let mut buf = Vec::new();

        loop {
            let bytes_read = match read_raw_line(&mut reader, &mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(?e, "event log read error during repair");
                    break;
                }
            };
            let line = match decode_line(&buf, expected) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(
                        event_id = expected,
                        ?e,
                        "event log corruption detected during repair"
                    );
                    break;
                }
            };
            position += bytes_read as u64;

            if line.trim().is_empty() {
                last_valid_position = position;
                continue;
            }

            if let Err(reason) = Self::check_line(line, expected) {
                tracing::warn!(
                    event_id = expected,
                    %reason,
                    "event log corruption detected during repair"
                );
                break;
            }

            expected += 1;
            last_valid_position = position;
        }

        let old_size = std::fs::metadata(path)?.len();
        if last_valid_position >= old_size {
            return Ok(0);
        }

        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(last_valid_position)?;
        file.sync_all()?;

        let removed = old_size - last_valid_position;
        tracing::info!(
            position = last_valid_position,
            removed,
            "truncated event log at last valid entry"
        );
        Ok(removed)
    }

    /// Append an event stamped with the current time
    pub fn append(&mut self, payload: EventPayload, target: Target) -> Result<Event, LogError> {
        self.append_with_timestamp(payload, target, Utc::now())
    }

    /// Append an event with a specific timestamp
    ///
    /// The event is durably persisted before this method returns. On failure
    /// the file is truncated back and no id is consumed.
    pub fn append_with_timestamp(
        &mut self,
        payload: EventPayload,
        target: Target,
        timestamp: DateTime<Utc>,
    ) -> Result<Event, LogError> {
        let event = Event::new(self.last_id() + 1, timestamp, payload, target)?;
        let mut line = LogEntry::from_event(&event)?.to_line()?;
        line.push('\n');

        if let Err(e) = self.write_line(line.as_bytes()) {
            tracing::error!(?e, event_id = event.id, "event append failed, rolling back");
            if let Err(e) = self.file.set_len(self.len) {
                tracing::error!(?e, "failed to truncate event log after failed append");
            }
            return Err(e.into());
        }

        self.offsets.push(self.len);
        self.len += line.len() as u64;
        Ok(event)
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Read the event with the given id
    pub fn read(&self, id: u64) -> Result<Event, LogError> {
        let offset = self.offset_of(id).ok_or(LogError::NotFound(id))?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(offset))?;
        read_event(&mut reader, id)
    }

    /// Iterate events from `start` through the current last id
    pub fn iter_from(&self, start: u64) -> Result<EventIter, LogError> {
        let last_id = self.last_id();
        if last_id == 0 && start == 1 {
            return Ok(EventIter::empty());
        }

        let offset = self.offset_of(start).ok_or(LogError::Range { start, last_id })?;
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(offset))?;

        Ok(EventIter {
            reader: Some(reader),
            next_id: start,
            last_id,
        })
    }

    /// Iterate every event
    pub fn iter(&self) -> Result<EventIter, LogError> {
        self.iter_from(1)
    }

    /// Delete every event with an id greater than `after_id`
    ///
    /// Returns the number of events removed.
    pub fn prune(&mut self, after_id: u64) -> Result<u64, LogError> {
        let last_id = self.last_id();
        if after_id >= last_id {
            return Ok(0);
        }

        let offset = self.offsets[after_id as usize];
        self.file.set_len(offset)?;
        self.file.sync_all()?;

        self.offsets.truncate(after_id as usize);
        self.len = offset;

        let removed = last_id - after_id;
        tracing::debug!(after_id, removed, "pruned event log");
        Ok(removed)
    }

    fn offset_of(&self, id: u64) -> Option<u64> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.offsets.get(index).copied()
    }

    /// Id of the newest event, or 0 when empty
    pub fn last_id(&self) -> u64 {
        self.offsets.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Current size of the segment file in bytes
    pub fn len_bytes(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read one line as raw bytes, including the trailing newline if present
fn read_raw_line(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}

fn decode_line(buf: &[u8], line: u64) -> Result<&str, LogError> {
    std::str::from_utf8(buf).map_err(|e| LogError::Corruption {
        line,
        reason: format!("invalid UTF-8: {e}"),
    })
}

fn read_event(reader: &mut BufReader<File>, id: u64) -> Result<Event, LogError> {
    let mut buf = Vec::new();
    if read_raw_line(reader, &mut buf)? == 0 {
        return Err(LogError::NotFound(id));
    }
    let line = decode_line(&buf, id)?;

    let entry = LogEntry::from_line(line.trim())?;
    if !entry.verify() || entry.id != id {
        return Err(LogError::Corruption {
            line: id,
            reason: format!("event {id} failed verification"),
        });
    }
    Ok(entry.into_event()?)
}

/// Finite iterator over events in ascending id order
///
/// Bounded by the last id at creation; events appended afterwards are not
/// yielded.
pub struct EventIter {
    reader: Option<BufReader<File>>,
    next_id: u64,
    last_id: u64,
}

impl EventIter {
    fn empty() -> Self {
        Self {
            reader: None,
            next_id: 1,
            last_id: 0,
        }
    }
}

impl Iterator for EventIter {
    type Item = Result<Event, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_id > self.last_id {
            return None;
        }
        let reader = self.reader.as_mut()?;

        let mut buf = Vec::new();
        loop {
            match read_raw_line(reader, &mut buf) {
                Ok(0) => {
                    self.reader = None;
                    return Some(Err(LogError::NotFound(self.next_id)));
                }
                Ok(_) if buf.trim_ascii().is_empty() => continue,
                Ok(_) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let result = decode_line(&buf, id)
                        .and_then(|line| LogEntry::from_line(line.trim()).map_err(LogError::from))
                        .and_then(|entry| {
                            if entry.verify() && entry.id == id {
                                Ok(entry.into_event()?)
                            } else {
                                Err(LogError::Corruption {
                                    line: id,
                                    reason: format!("event {id} failed verification"),
                                })
                            }
                        });
                    if result.is_err() {
                        self.reader = None;
                    }
                    return Some(result);
                }
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
