// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Translation table and path translator.
//!
//! The table is a static allow-list of `(source, destination)` pairs loaded
//! once at startup. Only leaves whose path exactly matches a source entry are
//! republished; everything else is dropped silently.
//!
//! # Load-time validation
//!
//! A table is rejected with [`AdapterError::Config`] if:
//!
//! - it has no entries
//! - any path is empty or has an empty segment
//! - two entries share a source path (after normalization)
//! - two entries share a destination path (after normalization)
//! - a destination path equals a source path, or one is an ancestor of the other
//!
//! The last rule is what keeps the relay from feeding itself: republished
//! destination leaves come back in the next snapshot, and none of them can
//! match (or sit inside) a translated source subtree.
//!
//! # File format
//!
//! Either an object or a list of entries, with `/` or `.` separators:
//!
//! ```json
//! { "Vehicle.Speed": "Vehicle.EgoVehicle.Motion.Locomotion.Speed" }
//! ```
//!
//! ```json
//! [ { "source": "Vehicle/Speed", "destination": "Vehicle/EgoVehicle/Motion/Locomotion/Speed" } ]
//! ```

use crate::error::{AdapterError, Result};
use crate::path::{normalize, Path};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Built-in mappings from COVESA VSS paths to the custom data model.
pub const DEFAULT_TRANSLATIONS: &[(&str, &str)] = &[
    ("Vehicle/Speed", "Vehicle/EgoVehicle/Motion/Locomotion/Speed"),
    (
        "Vehicle/CurrentLocation/Latitude",
        "Vehicle/EgoVehicle/General/State/CurrentLocation/Latitude",
    ),
    (
        "Vehicle/CurrentLocation/Longitude",
        "Vehicle/EgoVehicle/General/State/CurrentLocation/Longitude",
    ),
    (
        "Vehicle/CurrentLocation/Altitude",
        "Vehicle/EgoVehicle/General/State/CurrentLocation/Altitude",
    ),
];

/// One `(source, destination)` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub source: Path,
    pub destination: Path,
}

impl TranslationEntry {
    pub fn new(source: Path, destination: Path) -> Self {
        Self { source, destination }
    }

    /// Parse both sides, accepting either separator.
    pub fn parse(source: &str, destination: &str) -> Result<Self> {
        let source = Path::parse(source)
            .map_err(|e| AdapterError::Config(format!("invalid source path '{}': {}", source, e)))?;
        let destination = Path::parse(destination).map_err(|e| {
            AdapterError::Config(format!("invalid destination path '{}': {}", destination, e))
        })?;
        Ok(Self { source, destination })
    }
}

/// Raw on-disk shapes accepted by [`TranslationTable::from_json_str`].
#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Map(BTreeMap<String, String>),
    List(Vec<RawEntry>),
}

#[derive(Deserialize)]
struct RawEntry {
    source: String,
    destination: String,
}

/// Immutable source → destination lookup.
///
/// Read-only after construction, so it can be shared across tasks behind an
/// `Arc` without locking.
#[derive(Debug, Clone)]
pub struct TranslationTable {
    entries: Vec<TranslationEntry>,
    /// Canonical source string -> index into `entries`.
    by_source: HashMap<String, usize>,
}

impl TranslationTable {
    /// Validate and index a set of entries.
    pub fn new(entries: Vec<TranslationEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(AdapterError::Config("translation table is empty".to_string()));
        }

        let mut by_source = HashMap::with_capacity(entries.len());
        let mut by_destination: HashMap<String, usize> = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            let source = entry.source.to_canonical();
            if let Some(prev) = by_source.insert(source.clone(), i) {
                return Err(AdapterError::Config(format!(
                    "duplicate source path '{}' (entries {} and {})",
                    source, prev, i
                )));
            }

            let destination = entry.destination.to_canonical();
            if let Some(prev) = by_destination.insert(destination.clone(), i) {
                return Err(AdapterError::Config(format!(
                    "duplicate destination path '{}' (entries {} and {})",
                    destination, prev, i
                )));
            }
        }

        for dst in &entries {
            for src in &entries {
                if dst.destination.overlaps(&src.source) {
                    return Err(AdapterError::Config(format!(
                        "destination path '{}' overlaps source path '{}'; republished values would be translated again",
                        dst.destination, src.source
                    )));
                }
            }
        }

        Ok(Self { entries, by_source })
    }

    /// Build from string pairs in either separator style.
    pub fn from_pairs<I, S, D>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: AsRef<str>,
        D: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(s, d)| TranslationEntry::parse(s.as_ref(), d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    /// The built-in VSS → data model table.
    pub fn builtin() -> Result<Self> {
        Self::from_pairs(DEFAULT_TRANSLATIONS.iter().copied())
    }

    /// Parse a JSON table (object or entry list).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(json)
            .map_err(|e| AdapterError::Config(format!("invalid translation table JSON: {}", e)))?;
        match file {
            TableFile::Map(map) => Self::from_pairs(map),
            TableFile::List(list) => {
                Self::from_pairs(list.into_iter().map(|e| (e.source, e.destination)))
            }
        }
    }

    /// Load a JSON table from disk.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::Config(format!(
                "cannot read translation table '{}': {}",
                path.display(),
                e
            ))
        })?;
        let table = Self::from_json_str(&json)?;
        info!(path = %path.display(), entries = table.len(), "Loaded translation table");
        Ok(table)
    }

    /// Map a path string (either separator) to its destination.
    ///
    /// Returns `None` for unmapped paths; that is not an error.
    pub fn translate(&self, path: &str) -> Option<&Path> {
        self.by_source
            .get(normalize(path).as_str())
            .map(|&i| &self.entries[i].destination)
    }

    /// Map an already-split path to its destination.
    pub fn translate_path(&self, path: &Path) -> Option<&Path> {
        self.translate(&path.to_canonical())
    }

    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
