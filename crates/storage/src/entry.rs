// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log line with checksum verification
//!
//! Each line holds one event record plus a CRC32 checksum of the record
//! serialized without the checksum field.

use chrono::{DateTime, Utc};
use rb_core::{Event, EventError, EventRecord, EventType, Target};
use serde::{Deserialize, Serialize};

/// A single line of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub query: Target,
    pub timestamp: DateTime<Utc>,
    pub checksum: u32,
}

impl LogEntry {
    /// Create an entry with computed checksum
    pub fn new(record: EventRecord) -> Self {
        let checksum = Self::calculate_checksum(&record);
        Self {
            id: record.id,
            event_type: record.event_type,
            data: record.data,
            query: record.query,
            timestamp: record.timestamp,
            checksum,
        }
    }

    pub fn from_event(event: &Event) -> Result<Self, EventError> {
        Ok(Self::new(event.to_record()?))
    }

    /// CRC32 of the serialized record
    fn calculate_checksum(record: &EventRecord) -> u32 {
        // Records hold only JSON values, uuids, strings and integers, so
        // serialization cannot fail.
        let json = serde_json::to_string(record).unwrap_or_default();
        crc32fast::hash(json.as_bytes())
    }

    pub fn record(&self) -> EventRecord {
        EventRecord {
            id: self.id,
            event_type: self.event_type,
            data: self.data.clone(),
            query: self.query,
            timestamp: self.timestamp,
        }
    }

    /// Verify the checksum matches the record
    pub fn verify(&self) -> bool {
        self.checksum == Self::calculate_checksum(&self.record())
    }

    pub fn into_event(self) -> Result<Event, EventError> {
        Event::try_from(self.record())
    }

    /// Serialize to a single JSON line without the trailing newline
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
