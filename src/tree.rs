// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tree builder: `(path, leaf)` pairs back to a nested document.
//!
//! Inverse of [`crate::flatten`]. Intermediate segments are created as empty
//! objects on demand. Within one build, a later pair wins over an earlier one
//! at the same path; a later pair that needs to descend through an earlier
//! leaf replaces that leaf with an object.

use crate::document::Document;
use crate::flatten::LeafUpdate;
use crate::path::Path;
use std::collections::BTreeMap;

/// Build one nested document from `(path, value)` pairs.
///
/// Pairs with an empty path are ignored: the root of a patch is always an
/// object.
pub fn build<I>(pairs: I) -> Document
where
    I: IntoIterator<Item = (Path, Document)>,
{
    let mut root = BTreeMap::new();
    for (path, value) in pairs {
        insert(&mut root, path.segments(), value);
    }
    Document::Object(root)
}

/// Build from leaf updates.
pub fn build_leaves<I>(leaves: I) -> Document
where
    I: IntoIterator<Item = LeafUpdate>,
{
    build(leaves.into_iter().map(|l| (l.path, l.value)))
}

fn insert(node: &mut BTreeMap<String, Document>, segments: &[String], value: Document) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = node;
    for segment in parents {
        let child = node
            .entry(segment.clone())
            .or_insert_with(Document::empty);
        if !child.is_object() {
            *child = Document::empty();
        }
        node = match child {
            Document::Object(map) => map,
            // Replaced above.
            _ => return,
        };
    }
    node.insert(last.clone(), value);
}
