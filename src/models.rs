use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One flattened option contract: field name -> scalar value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: Map<String, Value>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.fields.get("symbol").and_then(Value::as_str)
    }
}

/// An entry the lenient table builder left out, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub symbol: String,
    pub reason: String,
}

/// Rows in API order. Columns are not fixed; see [`SnapshotTable::columns`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTable {
    pub records: Vec<FlatRecord>,
    pub rejected: Vec<RejectedEntry>,
}

impl SnapshotTable {
    /// Union of every key seen across all rows, in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut columns = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if seen.insert(key) {
                    columns.push(key.to_string());
                }
            }
        }
        columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A snapshot file already stored in the remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveFile {
    pub id: String,
    pub name: String,
    pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedArchive {
    pub id: String,
    pub name: String,
    #[serde(rename = "webViewLink", default)]
    pub view_link: Option<String>,
}
