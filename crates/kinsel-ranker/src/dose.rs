//! Dose-escalation screen.
//!
//! Compares one compound profiled at two concentrations. Targets whose
//! remaining binding drops sharply between the low and high dose are
//! picked up only at the higher concentration.

use std::collections::HashMap;

use kinsel_common::{CanonicalTable, KinselError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEscalation {
    pub gene_symbol: String,
    pub low_dose: f64,
    pub high_dose: f64,
    /// `low_dose - high_dose`
    pub diff: f64,
    pub flagged: bool,
}

/// Join `low` and `high` on symbol and compare `column`.
///
/// Only symbols present in both tables are reported, sorted by `diff`
/// descending (ties by symbol). Unresolved records are ignored.
pub fn dose_escalation(
    low: &CanonicalTable,
    high: &CanonicalTable,
    column: &str,
    threshold: f64,
) -> Result<Vec<DoseEscalation>> {
    for table in [low, high] {
        if table.is_empty() {
            return Err(KinselError::StructuralConfig(format!("table '{}' is empty", table.name)));
        }
        if !table.has_column(column) {
            return Err(KinselError::StructuralConfig(format!(
                "table '{}' has no column '{}'",
                table.name, column
            )));
        }
    }

    let high_values: HashMap<&str, f64> = high
        .records
        .iter()
        .filter(|r| r.is_resolved())
        .filter_map(|r| r.value(column).map(|v| (r.gene_symbol.as_str(), v)))
        .collect();

    let mut rows: Vec<DoseEscalation> = low
        .records
        .iter()
        .filter(|r| r.is_resolved())
        .filter_map(|r| {
            let low_dose = r.value(column)?;
            let high_dose = *high_values.get(r.gene_symbol.as_str())?;
            let diff = low_dose - high_dose;
            Some(DoseEscalation {
                gene_symbol: r.gene_symbol.clone(),
                low_dose,
                high_dose,
                diff,
                flagged: diff >= threshold,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.diff.total_cmp(&a.diff).then_with(|| a.gene_symbol.cmp(&b.gene_symbol)));

    info!(
        low = %low.name,
        high = %high.name,
        joined = rows.len(),
        flagged = rows.iter().filter(|r| r.flagged).count(),
        "Dose escalation screen"
    );
    Ok(rows)
}

/// Flagged symbols, sorted ascending.
pub fn flagged_symbols(rows: &[DoseEscalation]) -> Vec<String> {
    let mut symbols: Vec<String> = rows.iter().filter(|r| r.flagged).map(|r| r.gene_symbol.clone()).collect();
    symbols.sort();
    symbols
}
