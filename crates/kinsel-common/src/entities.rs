//! Record types shared by the normaliser and the fusion engine.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{KinselError, Result};

/// Matches returned by the gene-name namespace for a single query term.
/// `names[i]` is the official symbol of the gene with id `ids[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub names: Vec<String>,
    pub ids: Vec<String>,
}

impl ResolutionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.names.push(name.into());
        self.ids.push(id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One normalised target row.
///
/// An empty `gene_symbol` marks a label that could not be resolved (or was
/// explicitly overridden to unknown); such records must never reach fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub gene_symbol: String,
    pub original_label: String,
    pub measurements: BTreeMap<String, f64>,
}

impl CanonicalRecord {
    pub fn is_resolved(&self) -> bool {
        !self.gene_symbol.is_empty()
    }

    pub fn value(&self, column: &str) -> Option<f64> {
        self.measurements.get(column).copied()
    }
}

/// A normalised dataset: records sorted by symbol, measurement columns in
/// their source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, records: Vec<CanonicalRecord>) -> Self {
        Self { name: name.into(), columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn get(&self, symbol: &str) -> Option<&CanonicalRecord> {
        self.records.iter().find(|r| r.gene_symbol == symbol)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter().filter(|r| !r.is_resolved())
    }

    /// Copy of the table with every unresolved record removed.
    pub fn without_unresolved(&self) -> CanonicalTable {
        CanonicalTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| r.is_resolved()).cloned().collect(),
        }
    }

    /// Fails with `DuplicateSymbol` on the first resolved symbol seen twice.
    /// Unresolved records are not keyed and are skipped.
    pub fn check_unique_symbols(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for record in self.records.iter().filter(|r| r.is_resolved()) {
            if !seen.insert(record.gene_symbol.as_str()) {
                return Err(KinselError::DuplicateSymbol {
                    table: self.name.clone(),
                    symbol: record.gene_symbol.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, label: &str, value: f64) -> CanonicalRecord {
        CanonicalRecord {
            gene_symbol: symbol.to_string(),
            original_label: label.to_string(),
            measurements: BTreeMap::from([("STF1081".to_string(), value)]),
        }
    }

    #[test]
    fn test_without_unresolved_drops_empty_symbols() {
        let table = CanonicalTable::new(
            "Huang",
            vec!["STF1081".to_string()],
            vec![record("", "IR", 10.0), record("AKT2", "PKB beta", 20.0)],
        );
        let cleaned = table.without_unresolved();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.records[0].gene_symbol, "AKT2");
        assert_eq!(table.unresolved().count(), 1);
    }

    #[test]
    fn test_duplicate_symbol_is_reported() {
        let table = CanonicalTable::new(
            "Annes100",
            vec!["STF1081".to_string()],
            vec![record("ABL1", "ABL1", 1.0), record("ABL1", "ABL1(E255K)", 2.0)],
        );
        match table.check_unique_symbols() {
            Err(KinselError::DuplicateSymbol { table, symbol }) => {
                assert_eq!(table, "Annes100");
                assert_eq!(symbol, "ABL1");
            }
            other => panic!("expected DuplicateSymbol, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_records_do_not_collide() {
        let table = CanonicalTable::new(
            "Huang",
            vec!["STF1081".to_string()],
            vec![record("", "IR", 1.0), record("", "XYZ", 2.0)],
        );
        assert!(table.check_unique_symbols().is_ok());
    }
}
