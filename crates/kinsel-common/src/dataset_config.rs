//! Per-dataset normalisation configuration.
//!
//! Each selectivity study is described by a `DatasetSpec`: which columns
//! carry the target label and measurements, how the study encodes
//! missing / not-inhibited values and low-confidence calls, and which
//! hand-curated symbol corrections apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete description of one source dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Short dataset name, used in logs and output file names (e.g. "Klaeger")
    pub name: String,

    /// Input file, relative to the data directory
    pub file: String,

    /// Column holding the free-text target label
    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Measurement columns, in output order
    pub value_columns: Vec<String>,

    /// Delimiter joining several targets in one label (e.g. ";")
    #[serde(default)]
    pub composite_delimiter: Option<String>,

    /// Cell values read as missing (e.g. "n.d.")
    #[serde(default)]
    pub missing_tokens: Vec<String>,

    /// Cell values read as +infinity (e.g. "n.i.")
    #[serde(default)]
    pub infinity_tokens: Vec<String>,

    /// Handling of parenthesised low-confidence values
    #[serde(default)]
    pub confidence: ConfidencePolicy,

    /// How rows sharing a gene symbol are condensed
    #[serde(default)]
    pub aggregation: Aggregation,

    /// Manual label → symbol corrections. An empty symbol marks the label
    /// as explicitly unknown.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

fn default_label_column() -> String { "Name".to_string() }

/// Cells read as missing in every dataset, on top of `missing_tokens`.
/// Matches the NA markers common CSV exporters and pandas emit.
pub const DEFAULT_NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl DatasetSpec {
    /// Minimal spec with defaults for every optional field.
    pub fn new(name: &str, file: &str, value_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            label_column: default_label_column(),
            value_columns: value_columns.iter().map(|c| c.to_string()).collect(),
            composite_delimiter: None,
            missing_tokens: vec![],
            infinity_tokens: vec![],
            confidence: ConfidencePolicy::default(),
            aggregation: Aggregation::default(),
            overrides: BTreeMap::new(),
        }
    }

    /// Empty cells, NA markers, configured tokens and anything that parses
    /// to NaN all count as missing.
    pub fn is_missing_token(&self, value: &str) -> bool {
        let value = value.trim();
        value.is_empty()
            || DEFAULT_NA_TOKENS.contains(&value)
            || self.missing_tokens.iter().any(|t| t == value)
            || value.parse::<f64>().is_ok_and(f64::is_nan)
    }

    pub fn is_infinity_token(&self, value: &str) -> bool {
        self.infinity_tokens.iter().any(|t| t == value.trim())
    }
}

// ── Confidence annotations ───────────────────────────────────────────────────

/// Treatment of values written in parentheses, which some studies use to
/// mark low-confidence measurements (e.g. non-sigmoidal binding curves).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// Dataset carries no annotations; values are cast as-is.
    #[default]
    None,
    /// Drop any record with an annotated value.
    HighConfidenceOnly,
    /// Strip the parentheses and keep the value.
    Lenient,
}

// ── Condensation ─────────────────────────────────────────────────────────────

/// Aggregation applied elementwise when several records share one symbol
/// (phosphorylation states, mutants, split composites).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Median,
    Min,
    Max,
}

impl Aggregation {
    /// Apply to a non-empty group of values. Returns NaN for an empty slice.
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

// ── Measurement schemes ──────────────────────────────────────────────────────

/// Units of a dataset's measurements. Decides which comparator the fusion
/// engine uses for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementScheme {
    /// Binding remaining relative to DMSO control, 0–100+.
    PercentOfControl,
    /// Kinase activity remaining, 0–100+.
    PercentActivityRemaining,
    /// Apparent dissociation constant; +inf means not inhibited.
    ApparentKd,
}

impl MeasurementScheme {
    /// Fold-change data is compared by ratio, percentages by difference.
    pub fn is_fold_change(&self) -> bool {
        matches!(self, MeasurementScheme::ApparentKd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregations() {
        let v = [4.0, 1.0, 10.0];
        assert!((Aggregation::Mean.apply(&v) - 5.0).abs() < 1e-12);
        assert_eq!(Aggregation::Median.apply(&v), 4.0);
        assert_eq!(Aggregation::Median.apply(&[1.0, 2.0, 3.0, 10.0]), 2.5);
        assert_eq!(Aggregation::Min.apply(&v), 1.0);
        assert_eq!(Aggregation::Max.apply(&v), 10.0);
        assert!(Aggregation::Mean.apply(&[]).is_nan());
    }

    #[test]
    fn test_mean_with_infinity_stays_infinite() {
        assert!(Aggregation::Mean.apply(&[f64::INFINITY, 3.0]).is_infinite());
    }

    #[test]
    fn test_token_matching() {
        let mut spec = DatasetSpec::new("Klaeger", "Klaeger.csv", &["STF1081", "CC401"]);
        spec.missing_tokens = vec!["n.d.".to_string()];
        spec.infinity_tokens = vec!["n.i.".to_string()];
        assert!(spec.is_missing_token("n.d."));
        assert!(spec.is_missing_token("  "));
        assert!(!spec.is_missing_token("n.i."));
        assert!(spec.is_infinity_token(" n.i. "));
    }

    #[test]
    fn test_na_markers_are_missing_without_configuration() {
        let spec = DatasetSpec::new("Huang", "Huang.csv", &["STF1081", "HTH01091"]);
        for token in ["NA", "NaN", "nan", "-nan", "#N/A", "NULL", "None", " n/a "] {
            assert!(spec.is_missing_token(token), "{token:?} should be missing");
        }
        assert!(!spec.is_missing_token("12.5"));
        assert!(!spec.is_missing_token("inf"));
        assert!(!spec.is_missing_token("NAK"));
    }

    #[test]
    fn test_spec_deserialises_with_defaults() {
        let json = r#"{"name": "Huang", "file": "Huang.csv", "value_columns": ["STF1081", "HTH01091"]}"#;
        let spec: DatasetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.label_column, "Name");
        assert_eq!(spec.confidence, ConfidencePolicy::None);
        assert_eq!(spec.aggregation, Aggregation::Mean);
        assert!(spec.overrides.is_empty());
    }
}
