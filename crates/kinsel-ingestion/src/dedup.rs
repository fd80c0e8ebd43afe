//! Condensation of records that resolve to the same gene symbol.
//!
//! Several rows of one study can name the same gene (phosphorylation
//! states, mutants, both halves of a split composite label). Each group is
//! replaced by a single record whose measurements are aggregated column by
//! column. The first record of the group, in input order, supplies the
//! label. Unresolved records are never grouped with each other.

use std::collections::HashMap;

use kinsel_common::CanonicalRecord;

/// Result of a condensation pass.
#[derive(Debug, Clone)]
pub struct Condensed {
    pub records: Vec<CanonicalRecord>,
    /// Symbols that had more than one record.
    pub merged_symbols: Vec<String>,
}

/// Condense `records` by symbol, keeping first-occurrence order.
pub fn condense_by_symbol<F>(records: Vec<CanonicalRecord>, columns: &[String], aggregate: F) -> Condensed
where
    F: Fn(&[f64]) -> f64,
{
    let mut groups: Vec<Vec<CanonicalRecord>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        if !record.is_resolved() {
            groups.push(vec![record]);
            continue;
        }
        match index.get(&record.gene_symbol) {
            Some(&i) => groups[i].push(record),
            None => {
                index.insert(record.gene_symbol.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    let mut merged_symbols = Vec::new();
    let records = groups
        .into_iter()
        .map(|mut group| {
            if group.len() == 1 {
                return group.remove(0);
            }
            merged_symbols.push(group[0].gene_symbol.clone());
            let mut representative = group[0].clone();
            for column in columns {
                let values: Vec<f64> = group.iter().filter_map(|r| r.value(column)).collect();
                if !values.is_empty() {
                    representative.measurements.insert(column.clone(), aggregate(&values));
                }
            }
            representative
        })
        .collect();

    Condensed { records, merged_symbols }
}
