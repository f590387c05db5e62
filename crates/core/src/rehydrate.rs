// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Folding an OTU's events into its current state

use crate::apply::ApplyError;
use crate::event::{Event, EventType};
use crate::otu::Otu;
use thiserror::Error;

/// Errors that make an OTU's history unreplayable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RehydrateError {
    #[error("no events to rehydrate")]
    Empty,
    #[error("first event {event_id} is {event_type}, expected CreateOTU")]
    NotCreation { event_id: u64, event_type: EventType },
    #[error("event {next} follows event {previous} out of order")]
    OutOfOrder { previous: u64, next: u64 },
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Rebuild an OTU from its events in ascending id order
///
/// Isolates are sorted with named isolates first, by name then id. Each
/// isolate's sequences are sorted by accession then id.
pub fn rehydrate<'a, I>(events: I) -> Result<Otu, RehydrateError>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut events = events.into_iter();
    let first = events.next().ok_or(RehydrateError::Empty)?;

    let mut otu = first.create_otu().ok_or(RehydrateError::NotCreation {
        event_id: first.id,
        event_type: first.event_type(),
    })?;

    let mut previous = first.id;
    for event in events {
        if event.id <= previous {
            return Err(RehydrateError::OutOfOrder {
                previous,
                next: event.id,
            });
        }
        otu = event.apply(otu)?;
        previous = event.id;
    }

    otu.isolates.sort_by(|a, b| a.sort_order(b));
    for isolate in &mut otu.isolates {
        isolate
            .sequences
            .sort_by(|a, b| a.accession.cmp(&b.accession).then_with(|| a.id.cmp(&b.id)));
    }

    Ok(otu)
}

#[cfg(test)]
#[path = "rehydrate_tests.rs"]
mod tests;
