//! Dataset normalisation pipeline.
//!
//! Turns one raw selectivity table into a canonical, symbol-keyed table:
//!   1. Drop rows with a missing label or measurement
//!   2. Handle parenthesised low-confidence values
//!   3. Map "not inhibited" tokens to +inf and cast to f64
//!   4. Split composite labels ("CSNK2A1;CSNK2A3") into one row per target
//!   5. Resolve every distinct label to an official gene symbol
//!   6. Apply manual overrides
//!   7. Condense rows sharing a symbol
//!   8. Sort by symbol and check that symbols are unique
//!
//! Every stage returns a new collection. Unresolved labels are reported but
//! do not fail the run.

use std::collections::BTreeMap;

use kinsel_common::{CanonicalRecord, CanonicalTable, ConfidencePolicy, DatasetSpec, KinselError, Result};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::dedup::condense_by_symbol;
use crate::models::{ParsedRecord, RawRecord, RawTable};
use crate::normalise::{LookupFailure, ResolutionScheduler};

// ── Report ────────────────────────────────────────────────────────────────────

/// What happened to one dataset on its way through the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalisationReport {
    pub dataset: String,
    pub rows_read: usize,
    pub dropped_incomplete: usize,
    pub dropped_low_confidence: usize,
    pub composites_expanded: usize,
    pub lookup_failures: Vec<LookupFailure>,
    /// Labels left without a symbol after overrides.
    pub unresolved: Vec<String>,
    /// (label, symbol) pairs where the symbol differs from the label.
    pub renamed: Vec<(String, String)>,
    pub merged_symbols: Vec<String>,
    pub rows_written: usize,
    pub duration_ms: u64,
}

impl NormalisationReport {
    pub fn log(&self) {
        info!(
            dataset = %self.dataset,
            rows_read = self.rows_read,
            dropped_incomplete = self.dropped_incomplete,
            dropped_low_confidence = self.dropped_low_confidence,
            composites_expanded = self.composites_expanded,
            merged = self.merged_symbols.len(),
            rows_written = self.rows_written,
            duration_ms = self.duration_ms,
            "Dataset normalised"
        );
        for (label, symbol) in &self.renamed {
            debug!(dataset = %self.dataset, label = %label, symbol = %symbol, "Label renamed to official symbol");
        }
        for label in &self.unresolved {
            warn!(dataset = %self.dataset, label = %label, "No official gene symbol found");
        }
        for failure in &self.lookup_failures {
            warn!(dataset = %self.dataset, term = %failure.term, reason = %failure.reason, "Lookup failed");
        }
    }
}

/// Output of a normalisation run.
#[derive(Debug, Clone)]
pub struct NormalisedDataset {
    pub table: CanonicalTable,
    pub report: NormalisationReport,
}

// ── Stages ────────────────────────────────────────────────────────────────────

/// Stage 1: keep rows whose label and every measurement are present.
pub fn drop_incomplete(spec: &DatasetSpec, rows: &[RawRecord]) -> Vec<RawRecord> {
    rows.iter()
        .filter(|r| {
            !r.label.trim().is_empty()
                && spec.value_columns.iter().all(|c| {
                    r.values.get(c).map(|v| !spec.is_missing_token(v)).unwrap_or(false)
                })
        })
        .cloned()
        .collect()
}

fn is_annotated(value: &str) -> bool {
    value.contains('(')
}

/// Stage 2: drop or unwrap parenthesised values.
pub fn apply_confidence_policy(policy: ConfidencePolicy, rows: &[RawRecord]) -> Vec<RawRecord> {
    match policy {
        ConfidencePolicy::None => rows.to_vec(),
        ConfidencePolicy::HighConfidenceOnly => rows
            .iter()
            .filter(|r| !r.values.values().any(|v| is_annotated(v)))
            .cloned()
            .collect(),
        ConfidencePolicy::Lenient => rows
            .iter()
            .map(|r| RawRecord {
                label: r.label.clone(),
                values: r
                    .values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.trim().trim_matches(|c| c == '(' || c == ')').to_string()))
                    .collect(),
            })
            .collect(),
    }
}

/// Stage 3: sentinel tokens to +inf, everything else parsed as f64.
pub fn cast_measurements(spec: &DatasetSpec, rows: &[RawRecord]) -> Result<Vec<ParsedRecord>> {
    rows.iter()
        .map(|r| {
            let mut measurements = BTreeMap::new();
            for column in &spec.value_columns {
                let raw = r.values.get(column).map(String::as_str).unwrap_or_default();
                let invalid = || KinselError::InvalidMeasurement {
                    table: spec.name.clone(),
                    label: r.label.clone(),
                    column: column.clone(),
                    value: raw.to_string(),
                };
                let value = if spec.is_infinity_token(raw) {
                    f64::INFINITY
                } else {
                    // NaN cannot be written back to a canonical table
                    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan()).ok_or_else(invalid)?
                };
                measurements.insert(column.clone(), value);
            }
            Ok(ParsedRecord { label: r.label.clone(), measurements })
        })
        .collect()
}

/// Stage 4: one record per sub-label, each with a copy of the measurements.
///
/// A label made only of delimiters has no sub-labels; it passes through
/// unchanged so it surfaces as unresolved instead of vanishing.
pub fn expand_composites(delimiter: Option<&str>, rows: Vec<ParsedRecord>) -> (Vec<ParsedRecord>, usize) {
    let Some(delimiter) = delimiter.filter(|d| !d.is_empty()) else {
        return (rows, 0);
    };
    let mut expanded = 0;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let parts: Vec<&str> = row.label.split(delimiter).filter(|p| !p.trim().is_empty()).collect();
        if parts.is_empty() || !row.label.contains(delimiter) {
            out.push(row);
            continue;
        }
        expanded += 1;
        out.extend(parts.into_iter().map(|part| ParsedRecord {
            label: part.to_string(),
            measurements: row.measurements.clone(),
        }));
    }
    (out, expanded)
}

/// Stage 6: overrides replace the resolved symbol unconditionally.
pub fn apply_overrides(overrides: &BTreeMap<String, String>, records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    records
        .into_iter()
        .map(|mut r| {
            if let Some(symbol) = overrides.get(&r.original_label) {
                r.gene_symbol = symbol.clone();
            }
            r
        })
        .collect()
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Normalises datasets against a shared resolution scheduler.
pub struct DatasetNormaliser<'a> {
    scheduler: &'a ResolutionScheduler,
    concurrency: Option<usize>,
}

impl<'a> DatasetNormaliser<'a> {
    pub fn new(scheduler: &'a ResolutionScheduler, concurrency: Option<usize>) -> Self {
        Self { scheduler, concurrency }
    }

    /// Run the pipeline using the dataset's configured aggregation.
    pub async fn normalise(&self, spec: &DatasetSpec, raw: &RawTable) -> Result<NormalisedDataset> {
        let aggregation = spec.aggregation;
        self.normalise_with(spec, raw, |values| aggregation.apply(values)).await
    }

    /// Run the pipeline with a caller-supplied condensation function.
    #[instrument(skip(self, spec, raw, aggregate), fields(dataset = %spec.name))]
    pub async fn normalise_with<F>(&self, spec: &DatasetSpec, raw: &RawTable, aggregate: F) -> Result<NormalisedDataset>
    where
        F: Fn(&[f64]) -> f64,
    {
        let t0 = std::time::Instant::now();
        let mut report = NormalisationReport {
            dataset: spec.name.clone(),
            rows_read: raw.records.len(),
            ..Default::default()
        };

        let complete = drop_incomplete(spec, &raw.records);
        report.dropped_incomplete = raw.records.len() - complete.len();

        let confident = apply_confidence_policy(spec.confidence, &complete);
        report.dropped_low_confidence = complete.len() - confident.len();

        let parsed = cast_measurements(spec, &confident)?;
        let (parsed, expanded) = expand_composites(spec.composite_delimiter.as_deref(), parsed);
        report.composites_expanded = expanded;

        let labels: Vec<String> = parsed.iter().map(|r| r.label.clone()).collect();
        let batch = self.scheduler.resolve_all(&labels, self.concurrency).await;
        report.lookup_failures = batch.failures;

        let resolved: Vec<CanonicalRecord> = parsed
            .into_iter()
            .zip(batch.symbols)
            .map(|(r, gene_symbol)| CanonicalRecord {
                gene_symbol,
                original_label: r.label,
                measurements: r.measurements,
            })
            .collect();

        let overridden = apply_overrides(&spec.overrides, resolved);

        let condensed = condense_by_symbol(overridden, &spec.value_columns, aggregate);
        report.merged_symbols = condensed.merged_symbols;

        let mut records = condensed.records;
        records.sort_by(|a, b| {
            a.gene_symbol
                .cmp(&b.gene_symbol)
                .then_with(|| a.original_label.cmp(&b.original_label))
        });

        let table = CanonicalTable::new(spec.name.clone(), spec.value_columns.clone(), records);
        table.check_unique_symbols()?;

        report.unresolved = table.unresolved().map(|r| r.original_label.clone()).collect();
        report.renamed = table
            .records
            .iter()
            .filter(|r| r.is_resolved() && r.gene_symbol != r.original_label)
            .map(|r| (r.original_label.clone(), r.gene_symbol.clone()))
            .collect();
        report.rows_written = table.len();
        report.duration_ms = t0.elapsed().as_millis() as u64;
        report.log();

        Ok(NormalisedDataset { table, report })
    }
}
