//! Data models for the normalisation pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of a source dataset as read: the target label and the raw
/// text of each configured measurement column. Empty cells are kept as "".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub label: String,
    pub values: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(label: &str, values: &[(&str, &str)]) -> Self {
        Self {
            label: label.to_string(),
            values: values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// A source dataset restricted to its label and measurement columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub records: Vec<RawRecord>,
}

/// A record after numeric casting, before symbol resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub label: String,
    pub measurements: BTreeMap<String, f64>,
}
