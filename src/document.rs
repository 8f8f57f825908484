// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shadow document model.
//!
//! A document is the store's nested state for one `thing`. Every node is one of
//! three closed variants, so deciding whether to descend is an exhaustive
//! match rather than a runtime type check:
//!
//! ```text
//! Document
//! ├── Object(map)   descended into, never a leaf
//! ├── Scalar(value) null | bool | number | string, always a leaf
//! └── Opaque(blob)  arrays, always a leaf, never recursed into
//! ```
//!
//! Documents convert losslessly to and from [`serde_json::Value`] and
//! serialize as the equivalent plain JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// A node of a shadow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Document {
    /// Nested object. Empty objects carry no addressable value.
    Object(BTreeMap<String, Document>),
    /// Scalar leaf.
    Scalar(Scalar),
    /// Opaque composite (arrays). Kept verbatim.
    Opaque(Value),
}

impl Document {
    /// An empty object.
    pub fn empty() -> Self {
        Document::Object(BTreeMap::new())
    }

    /// Check if this node is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Document::Object(_))
    }

    /// Check if this node is a leaf (scalar or opaque).
    pub fn is_leaf(&self) -> bool {
        !self.is_object()
    }

    /// Borrow the children if this is an object.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Document>> {
        match self {
            Document::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Descend by segments. Returns `None` if any step is missing or a leaf.
    pub fn get<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Document> {
        let mut node = self;
        for segment in segments {
            node = node.as_object()?.get(segment.as_ref())?;
        }
        Some(node)
    }

    /// Short description of the node kind, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Object(_) => "object",
            Document::Scalar(Scalar::Null) => "null",
            Document::Scalar(Scalar::Bool(_)) => "bool",
            Document::Scalar(Scalar::Number(_)) => "number",
            Document::Scalar(Scalar::String(_)) => "string",
            Document::Opaque(_) => "opaque",
        }
    }

    /// Convert into a plain JSON value.
    pub fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Document::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Document::from(v)))
                    .collect(),
            ),
            Value::Null => Document::Scalar(Scalar::Null),
            Value::Bool(b) => Document::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Document::Scalar(Scalar::Number(n)),
            Value::String(s) => Document::Scalar(Scalar::String(s)),
            opaque @ Value::Array(_) => Document::Opaque(opaque),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        match doc {
            Document::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
            Document::Scalar(Scalar::Null) => Value::Null,
            Document::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Document::Scalar(Scalar::Number(n)) => Value::Number(n),
            Document::Scalar(Scalar::String(s)) => Value::String(s),
            Document::Opaque(v) => v,
        }
    }
}

impl From<f64> for Document {
    fn from(v: f64) -> Self {
        Document::from(Value::from(v))
    }
}

impl From<i64> for Document {
    fn from(v: i64) -> Self {
        Document::Scalar(Scalar::Number(Number::from(v)))
    }
}

impl From<bool> for Document {
    fn from(v: bool) -> Self {
        Document::Scalar(Scalar::Bool(v))
    }
}

impl From<&str> for Document {
    fn from(v: &str) -> Self {
        Document::Scalar(Scalar::String(v.to_string()))
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::from(self.clone()))
    }
}
