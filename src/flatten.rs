// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Path flattener: nested document to `(path, leaf)` pairs.
//!
//! The walk uses an explicit stack of child iterators plus a growing segment
//! list, so leaves are produced lazily and no path string is built until a
//! leaf is reached. Objects are always descended into (an empty object yields
//! nothing); scalars and opaque values are leaves.

use crate::document::Document;
use crate::error::{AdapterError, Result};
use crate::path::Path;
use std::collections::btree_map;

/// A leaf extracted from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafUpdate {
    pub path: Path,
    pub value: Document,
}

impl LeafUpdate {
    pub fn new(path: Path, value: Document) -> Self {
        Self { path, value }
    }
}

/// Lazy iterator over the leaves of a document, depth-first in key order.
pub struct Leaves<'a> {
    stack: Vec<btree_map::Iter<'a, String, Document>>,
    prefix: Vec<&'a str>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Path, &'a Document);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                    self.prefix.pop();
                }
                Some((key, Document::Object(children))) => {
                    self.prefix.push(key.as_str());
                    self.stack.push(children.iter());
                }
                Some((key, leaf)) => {
                    let path = Path::from_segments(
                        self.prefix.iter().copied().chain(std::iter::once(key.as_str())),
                    );
                    return Some((path, leaf));
                }
            }
        }
    }
}

/// Iterate the leaves of a snapshot.
///
/// The snapshot root must be an object; a scalar or array root has no
/// addressable paths and is reported as malformed.
pub fn leaves(doc: &Document) -> Result<Leaves<'_>> {
    match doc {
        Document::Object(root) => Ok(Leaves {
            stack: vec![root.iter()],
            prefix: Vec::new(),
        }),
        other => Err(AdapterError::MalformedSnapshot(format!(
            "snapshot root must be an object, got {}",
            other.kind()
        ))),
    }
}

/// Collect every leaf of a snapshot with an owned copy of its value.
pub fn flatten(doc: &Document) -> Result<Vec<LeafUpdate>> {
    Ok(leaves(doc)?
        .map(|(path, value)| LeafUpdate::new(path, value.clone()))
        .collect())
}
