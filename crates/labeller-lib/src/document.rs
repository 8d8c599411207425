//! Typed view over a resource's nested `spec`/`status` trees
//!
//! Managed resources carry provider-defined fields of arbitrary shape. Rather
//! than asserting types at every level of nesting, the tree is decoded once
//! into a [`Document`] and walked with accessors that return `None` on any
//! shape mismatch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recursive structured value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Document>),
    Map(BTreeMap<String, Document>),
}

impl Document {
    /// An empty map
    pub fn empty_map() -> Self {
        Document::Map(BTreeMap::new())
    }

    /// Look up a key when this is a map
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Walk a sequence of map keys
    pub fn path(&self, keys: &[&str]) -> Option<&Document> {
        keys.iter().try_fold(self, |doc, key| doc.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Document>> {
        match self {
            Document::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Document]> {
        match self {
            Document::List(items) => Some(items),
            _ => None,
        }
    }

    /// String value under `key`, skipping empty strings
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Document::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Iterate the string-valued entries of a map, in key order
    pub fn string_entries(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.as_map()
            .into_iter()
            .flat_map(|m| m.iter())
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Document::Null,
            serde_json::Value::Bool(b) => Document::Bool(b),
            serde_json::Value::Number(n) => Document::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Document::String(s),
            serde_json::Value::Array(items) => {
                Document::List(items.into_iter().map(Document::from).collect())
            }
            serde_json::Value::Object(map) => Document::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Document::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::String(s.to_string())
    }
}
