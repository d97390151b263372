//! Structural locators shared by detection and replacement.
//!
//! The textual form is a stable contract: detection hands instance ids to the
//! caller, and the caller hands them back as per-instance overrides.
//!
//! ```text
//! p4-s10-e22            body paragraph 4, chars 10..22
//! t0-r1-c2-p0-s0-e5     table 0, row 1, cell 2, paragraph 0, chars 0..5
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LocatorParseError;

/// Where a paragraph sits in reading order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParagraphPath {
    Body {
        paragraph: usize,
    },
    Cell {
        table: usize,
        row: usize,
        cell: usize,
        paragraph: usize,
    },
}

impl fmt::Display for ParagraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParagraphPath::Body { paragraph } => write!(f, "p{paragraph}"),
            ParagraphPath::Cell {
                table,
                row,
                cell,
                paragraph,
            } => write!(f, "t{table}-r{row}-c{cell}-p{paragraph}"),
        }
    }
}

/// One placeholder occurrence: paragraph plus character span of the match in
/// the paragraph's flattened text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    pub path: ParagraphPath,
    pub start: usize,
    pub end: usize,
}

impl InstanceId {
    pub fn new(path: ParagraphPath, start: usize, end: usize) -> Self {
        Self { path, start, end }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-s{}-e{}", self.path, self.start, self.end)
    }
}

fn take_index(part: Option<&str>, tag: char, raw: &str) -> Result<usize, LocatorParseError> {
    part.and_then(|p| p.strip_prefix(tag))
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(|| LocatorParseError(raw.to_string()))
}

impl FromStr for InstanceId {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let parts: Vec<&str> = raw.split('-').collect();
        let err = || LocatorParseError(raw.to_string());
        let path = match parts.len() {
            3 => ParagraphPath::Body {
                paragraph: take_index(parts.first().copied(), 'p', raw)?,
            },
            6 => ParagraphPath::Cell {
                table: take_index(parts.first().copied(), 't', raw)?,
                row: take_index(parts.get(1).copied(), 'r', raw)?,
                cell: take_index(parts.get(2).copied(), 'c', raw)?,
                paragraph: take_index(parts.get(3).copied(), 'p', raw)?,
            },
            _ => return Err(err()),
        };
        let n = parts.len();
        let start = take_index(parts.get(n - 2).copied(), 's', raw)?;
        let end = take_index(parts.get(n - 1).copied(), 'e', raw)?;
        if end < start {
            return Err(err());
        }
        Ok(InstanceId { path, start, end })
    }
}

impl Serialize for InstanceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstanceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
