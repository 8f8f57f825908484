// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hierarchical data point paths.
//!
//! VSS paths are written either with `/` (`Vehicle/Speed`) or with `.`
//! (`Vehicle.Speed`). Both forms are equivalent. Internally a path is an
//! ordered list of segments and its canonical string form uses `/`.

use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};

/// Canonical separator used for storage and lookup.
pub const SEPARATOR: char = '/';

/// Alternative separator accepted on input.
pub const ALT_SEPARATOR: char = '.';

fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == ALT_SEPARATOR
}

/// Normalize a path string to the canonical separator.
///
/// Total: never fails, never drops characters other than rewriting `.` to `/`.
pub fn normalize(path: &str) -> String {
    path.replace(ALT_SEPARATOR, "/")
}

/// An ordered list of non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a path written with either separator.
    ///
    /// Rejects the empty string and any empty segment
    /// (`/Vehicle`, `Vehicle//Speed`, `Vehicle.`).
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(AdapterError::Config("empty path".to_string()));
        }
        let segments: Vec<String> = raw.split(is_separator).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(AdapterError::Config(format!(
                "path '{}' contains an empty segment",
                raw
            )));
        }
        Ok(Self { segments })
    }

    /// Build from segments that are already split.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Check if either path is equal to or an ancestor of the other.
    pub fn overlaps(&self, other: &Path) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    /// Canonical `/`-joined form.
    pub fn to_canonical(&self) -> String {
        self.segments.join("/")
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl std::str::FromStr for Path {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = AdapterError;

    fn try_from(s: String) -> Result<Self> {
        Path::parse(&s)
    }
}

impl From<Path> for String {
    fn from(p: Path) -> Self {
        p.to_canonical()
    }
}
