//! Cross-dataset fusion.
//!
//! Each normalised dataset is reduced to a `FusionTable`: one
//! (probe, reference) pair per gene symbol, where the probe is the compound
//! whose toxicity is being explained and the reference is the less toxic
//! comparator. Two consensus views are produced from a set of tables:
//!
//! - `consensus_set`: symbols flagged in every table.
//! - `fuse_ranks`: symbols present in every table, ordered by summed
//!   positional rank.

use std::collections::{BTreeMap, HashSet};

use kinsel_common::{CanonicalTable, KinselError, MeasurementScheme, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::normalise::{positional_rank, rank_order};
use crate::thresholds::{BooleanMode, Thresholds};

/// One target's two measurements from a single dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionEntry {
    pub gene_symbol: String,
    pub probe: f64,
    pub reference: f64,
}

impl FusionEntry {
    /// `reference - probe`. Positive when the probe inhibits more.
    pub fn diff(&self) -> f64 {
        self.reference - self.probe
    }

    /// `reference / probe`, for binding-constant data.
    pub fn fold(&self) -> f64 {
        self.reference / self.probe
    }
}

/// A target's position within one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTarget {
    pub gene_symbol: String,
    pub diff: f64,
    /// In [0, 1); 0 is the strongest candidate.
    pub rank: f64,
}

/// Validated fusion input for one dataset.
#[derive(Debug, Clone)]
pub struct FusionTable {
    pub name: String,
    pub scheme: MeasurementScheme,
    pub entries: Vec<FusionEntry>,
}

impl FusionTable {
    /// Build from a normalised table.
    ///
    /// Fails when the table is empty, a column is missing, a record lacks
    /// a value, a record is unresolved, or a symbol repeats.
    pub fn new(
        table: &CanonicalTable,
        scheme: MeasurementScheme,
        probe_column: &str,
        reference_column: &str,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(KinselError::StructuralConfig(format!("table '{}' is empty", table.name)));
        }
        for column in [probe_column, reference_column] {
            if !table.has_column(column) {
                return Err(KinselError::StructuralConfig(format!(
                    "table '{}' has no column '{}'",
                    table.name, column
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(table.len());
        for record in &table.records {
            if !record.is_resolved() {
                return Err(KinselError::UnresolvedSymbol {
                    table: table.name.clone(),
                    label: record.original_label.clone(),
                });
            }
            if !seen.insert(record.gene_symbol.as_str()) {
                return Err(KinselError::DuplicateSymbol {
                    table: table.name.clone(),
                    symbol: record.gene_symbol.clone(),
                });
            }
            let value = |column: &str| {
                record.value(column).ok_or_else(|| {
                    KinselError::StructuralConfig(format!(
                        "table '{}': '{}' has no value for '{}'",
                        table.name, record.gene_symbol, column
                    ))
                })
            };
            entries.push(FusionEntry {
                gene_symbol: record.gene_symbol.clone(),
                probe: value(probe_column)?,
                reference: value(reference_column)?,
            });
        }

        Ok(Self { name: table.name.clone(), scheme, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-target flag under `mode`.
    pub fn classify(&self, entry: &FusionEntry, mode: BooleanMode, thresholds: &Thresholds) -> bool {
        match (mode, self.scheme.is_fold_change()) {
            (BooleanMode::RelativeDifference, true) => entry.fold() >= thresholds.diff_fold_threshold,
            (BooleanMode::RelativeDifference, false) => entry.diff() >= thresholds.diff_percent_threshold,
            // Not inhibited by the reference, bound by the probe.
            (BooleanMode::AbsoluteThreshold, true) => {
                entry.reference == f64::INFINITY && entry.probe.is_finite()
            }
            (BooleanMode::AbsoluteThreshold, false) => {
                entry.reference >= thresholds.max_percent_threshold
                    && entry.probe <= thresholds.min_percent_threshold
            }
        }
    }

    /// Symbols flagged `true` in this table.
    pub fn flag(&self, mode: BooleanMode, thresholds: &Thresholds) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|e| self.classify(e, mode, thresholds))
            .map(|e| e.gene_symbol.as_str())
            .collect()
    }

    /// Targets ordered by difference, each with its positional rank.
    pub fn rank_table(&self) -> Vec<RankedTarget> {
        let keys: Vec<(f64, f64)> = self.entries.iter().map(|e| (e.diff(), e.probe)).collect();
        let n = self.entries.len();
        rank_order(&keys)
            .into_iter()
            .enumerate()
            .map(|(position, i)| RankedTarget {
                gene_symbol: self.entries[i].gene_symbol.clone(),
                diff: keys[i].0,
                rank: positional_rank(position, n),
            })
            .collect()
    }
}

/// Symbols flagged in every table, sorted ascending.
pub fn consensus_set(tables: &[FusionTable], mode: BooleanMode, thresholds: &Thresholds) -> Result<Vec<String>> {
    let (first, rest) = tables
        .split_first()
        .ok_or_else(|| KinselError::StructuralConfig("consensus needs at least one table".to_string()))?;

    let mut consensus = first.flag(mode, thresholds);
    debug!(table = %first.name, flagged = consensus.len(), "Flagged targets");
    for table in rest {
        let flagged = table.flag(mode, thresholds);
        debug!(table = %table.name, flagged = flagged.len(), "Flagged targets");
        consensus.retain(|s| flagged.contains(s));
    }

    let mut symbols: Vec<String> = consensus.into_iter().map(String::from).collect();
    symbols.sort();
    info!(tables = tables.len(), mode = ?mode, consensus = symbols.len(), "Consensus set computed");
    Ok(symbols)
}

/// Summed positional rank for symbols present in every table, ascending,
/// ties broken by symbol.
pub fn fuse_ranks(tables: &[FusionTable]) -> Result<Vec<(String, f64)>> {
    if tables.is_empty() {
        return Err(KinselError::StructuralConfig("rank fusion needs at least one table".to_string()));
    }

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for table in tables {
        for ranked in table.rank_table() {
            let slot = sums.entry(ranked.gene_symbol).or_insert((0.0, 0));
            slot.0 += ranked.rank;
            slot.1 += 1;
        }
    }

    let mut fused: Vec<(String, f64)> = sums
        .into_iter()
        .filter(|(_, (_, count))| *count == tables.len())
        .map(|(symbol, (sum, _))| (symbol, sum))
        .collect();
    fused.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    info!(tables = tables.len(), fused = fused.len(), "Rank fusion complete");
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinsel_common::CanonicalRecord;
    use pretty_assertions::assert_eq;

    fn canonical(name: &str, rows: &[(&str, f64, f64)]) -> CanonicalTable {
        CanonicalTable::new(
            name,
            vec!["STF1081".to_string(), "REF".to_string()],
            rows.iter()
                .map(|(s, p, r)| CanonicalRecord {
                    gene_symbol: s.to_string(),
                    original_label: s.to_string(),
                    measurements: BTreeMap::from([
                        ("STF1081".to_string(), *p),
                        ("REF".to_string(), *r),
                    ]),
                })
                .collect(),
        )
    }

    fn table(name: &str, scheme: MeasurementScheme, rows: &[(&str, f64, f64)]) -> FusionTable {
        FusionTable::new(&canonical(name, rows), scheme, "STF1081", "REF").unwrap()
    }

    #[test]
    fn test_fold_threshold() {
        let t = table(
            "Klaeger",
            MeasurementScheme::ApparentKd,
            &[("AAK1", 10.0, 220.0), ("BMP2K", 10.0, 150.0)],
        );
        let flagged = t.flag(BooleanMode::RelativeDifference, &Thresholds::default());
        assert!(flagged.contains("AAK1"));
        assert!(!flagged.contains("BMP2K"));
    }

    #[test]
    fn test_fold_with_unbound_reference() {
        let t = table(
            "Klaeger",
            MeasurementScheme::ApparentKd,
            &[("AAK1", 50.0, f64::INFINITY), ("GAK", f64::INFINITY, f64::INFINITY)],
        );
        let flagged = t.flag(BooleanMode::RelativeDifference, &Thresholds::default());
        assert_eq!(flagged, HashSet::from(["AAK1"]));
    }

    #[test]
    fn test_three_table_consensus() {
        let thresholds = Thresholds::default();
        let a = table("A", MeasurementScheme::PercentOfControl, &[("X", 5.0, 90.0), ("Y", 5.0, 90.0)]);
        let b = table("B", MeasurementScheme::PercentActivityRemaining, &[("X", 10.0, 80.0), ("Y", 60.0, 70.0)]);
        let c = table("C", MeasurementScheme::ApparentKd, &[("X", 1.0, 100.0), ("Y", 1.0, 100.0)]);
        let set = consensus_set(&[a, b, c], BooleanMode::RelativeDifference, &thresholds).unwrap();
        assert_eq!(set, vec!["X".to_string()]);
    }

    #[test]
    fn test_absolute_mode() {
        let thresholds = Thresholds::default();
        let pct = table(
            "Annes100",
            MeasurementScheme::PercentOfControl,
            &[("AAK1", 20.0, 80.0), ("BIKE", 30.0, 95.0), ("GAK", 10.0, 70.0)],
        );
        assert_eq!(pct.flag(BooleanMode::AbsoluteThreshold, &thresholds), HashSet::from(["AAK1"]));

        let kd = table(
            "Klaeger",
            MeasurementScheme::ApparentKd,
            &[("AAK1", 40.0, f64::INFINITY), ("GAK", 40.0, 9000.0)],
        );
        assert_eq!(kd.flag(BooleanMode::AbsoluteThreshold, &thresholds), HashSet::from(["AAK1"]));
    }

    #[test]
    fn test_consensus_sorted() {
        let t = table(
            "A",
            MeasurementScheme::PercentOfControl,
            &[("STK16", 0.0, 100.0), ("AAK1", 0.0, 100.0), ("GAK", 0.0, 100.0)],
        );
        let set = consensus_set(&[t], BooleanMode::RelativeDifference, &Thresholds::default()).unwrap();
        assert_eq!(set, vec!["AAK1", "GAK", "STK16"]);
    }

    #[test]
    fn test_rank_table_bounds_and_order() {
        let t = table(
            "A",
            MeasurementScheme::PercentOfControl,
            &[("A1", 50.0, 60.0), ("B1", 10.0, 90.0), ("C1", 5.0, 15.0), ("D1", 30.0, 40.0)],
        );
        let ranked = t.rank_table();
        let symbols: Vec<&str> = ranked.iter().map(|r| r.gene_symbol.as_str()).collect();
        // A1, C1, D1 share diff 10; smaller probe first.
        assert_eq!(symbols, vec!["B1", "C1", "D1", "A1"]);
        assert_eq!(ranked[0].rank, 0.0);
        assert_eq!(ranked[3].rank, 0.75);
        assert!(ranked.windows(2).all(|w| w[0].rank < w[1].rank));
    }

    #[test]
    fn test_fuse_ranks_intersects_tables() {
        let a = table(
            "A",
            MeasurementScheme::PercentOfControl,
            &[("X", 0.0, 100.0), ("Y", 0.0, 50.0), ("Z", 0.0, 10.0)],
        );
        let b = table("B", MeasurementScheme::PercentOfControl, &[("Y", 0.0, 100.0), ("X", 0.0, 50.0)]);
        let fused = fuse_ranks(&[a, b]).unwrap();
        // X: 0 + 0.5, Y: 1/3 + 0; Z absent from B.
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].0, "Y");
        assert!((fused[0].1 - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(fused[1], ("X".to_string(), 0.5));
    }

    #[test]
    fn test_fuse_ranks_ties_by_symbol() {
        let a = table("A", MeasurementScheme::PercentOfControl, &[("P", 0.0, 10.0), ("Q", 0.0, 20.0)]);
        let b = table("B", MeasurementScheme::PercentOfControl, &[("P", 0.0, 20.0), ("Q", 0.0, 10.0)]);
        let fused = fuse_ranks(&[a, b]).unwrap();
        assert_eq!(fused, vec![("P".to_string(), 0.5), ("Q".to_string(), 0.5)]);
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = FusionTable::new(&canonical("A", &[]), MeasurementScheme::PercentOfControl, "STF1081", "REF")
            .unwrap_err();
        assert!(matches!(err, KinselError::StructuralConfig(_)));
    }

    #[test]
    fn test_missing_column_rejected() {
        let err = FusionTable::new(
            &canonical("A", &[("X", 1.0, 2.0)]),
            MeasurementScheme::PercentOfControl,
            "STF1081",
            "CC401",
        )
        .unwrap_err();
        assert!(matches!(err, KinselError::StructuralConfig(msg) if msg.contains("CC401")));
    }

    #[test]
    fn test_unresolved_symbol_rejected() {
        let err = FusionTable::new(
            &canonical("Huang", &[("", 1.0, 2.0), ("X", 1.0, 2.0)]),
            MeasurementScheme::PercentActivityRemaining,
            "STF1081",
            "REF",
        )
        .unwrap_err();
        assert!(matches!(err, KinselError::UnresolvedSymbol { .. }));

        let cleaned = canonical("Huang", &[("", 1.0, 2.0), ("X", 1.0, 2.0)]).without_unresolved();
        let ok = FusionTable::new(&cleaned, MeasurementScheme::PercentActivityRemaining, "STF1081", "REF").unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn test_no_tables_rejected() {
        assert!(consensus_set(&[], BooleanMode::RelativeDifference, &Thresholds::default()).is_err());
        assert!(fuse_ranks(&[]).is_err());
    }
}
