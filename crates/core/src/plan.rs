// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment plans describing the expected genome layout of an OTU

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors from checking a plan's segment naming
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan has no segments")]
    Empty,
    #[error("all segments must have a name in a multipartite plan")]
    UnnamedSegment,
    #[error("segment names must be unique within a plan: {0}")]
    DuplicateName(SegmentName),
}

/// How important a segment is for an isolate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRule {
    #[default]
    Required,
    Recommended,
    Optional,
}

/// A normalized segment name such as `DNA A`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentName {
    pub prefix: String,
    pub key: String,
}

impl SegmentName {
    pub fn new(prefix: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key: key.into(),
        }
    }

    /// Parse `PREFIX KEY` where the separator is any run of `-`, `_` or spaces
    pub fn parse(s: &str) -> Option<Self> {
        let split = s.find(['-', '_', ' '])?;
        let (prefix, rest) = s.split_at(split);
        let key = rest.trim_start_matches(['-', '_', ' ']);

        if prefix.is_empty()
            || key.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphabetic())
        {
            return None;
        }

        Some(Self::new(prefix, key))
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.prefix, self.key)
    }
}

/// One segment of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    /// Expected sequence length
    pub length: u64,
    /// Accepted fractional deviation from `length`, within `[0, 1]`
    pub length_tolerance: f64,
    pub name: Option<SegmentName>,
    #[serde(default)]
    pub rule: SegmentRule,
}

impl Segment {
    pub fn new(id: Uuid, length: u64, length_tolerance: f64, name: Option<SegmentName>) -> Self {
        Self {
            id,
            length,
            length_tolerance: length_tolerance.clamp(0.0, 1.0),
            name,
            rule: SegmentRule::Required,
        }
    }

    pub fn with_rule(mut self, rule: SegmentRule) -> Self {
        self.rule = rule;
        self
    }

    /// Inclusive bounds on an acceptable sequence length
    pub fn length_bounds(&self) -> (u64, u64) {
        let length = self.length as f64;
        let min = (length * (1.0 - self.length_tolerance)).floor() as u64;
        let max = (length * (1.0 + self.length_tolerance)).floor() as u64;
        (min, max)
    }

    pub fn accepts_length(&self, length: usize) -> bool {
        let (min, max) = self.length_bounds();
        let length = length as u64;
        length >= min && length <= max
    }
}

/// The segments an isolate of an OTU is expected to carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub segments: Vec<Segment>,
}

impl Plan {
    /// Build a plan, rejecting layouts that break the naming rule
    pub fn new(id: Uuid, segments: Vec<Segment>) -> Result<Self, PlanError> {
        let plan = Self { id, segments };
        plan.check_naming()?;
        Ok(plan)
    }

    /// A single-segment plan
    pub fn monopartite(id: Uuid, segment: Segment) -> Self {
        Self {
            id,
            segments: vec![segment],
        }
    }

    pub fn is_monopartite(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn segment_ids(&self) -> BTreeSet<Uuid> {
        self.segments.iter().map(|s| s.id).collect()
    }

    pub fn required_segment_ids(&self) -> BTreeSet<Uuid> {
        self.segments
            .iter()
            .filter(|s| s.rule == SegmentRule::Required)
            .map(|s| s.id)
            .collect()
    }

    pub fn get_segment(&self, segment_id: Uuid) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    pub fn get_segment_by_name_key(&self, key: &str) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| s.name.as_ref().is_some_and(|n| n.key == key))
    }

    /// Multipartite plans need a unique name on every segment
    pub fn check_naming(&self) -> Result<(), PlanError> {
        if self.segments.is_empty() {
            return Err(PlanError::Empty);
        }
        if self.is_monopartite() {
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        for segment in &self.segments {
            let name = segment.name.as_ref().ok_or(PlanError::UnnamedSegment)?;
            if !seen.insert(name) {
                return Err(PlanError::DuplicateName(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
