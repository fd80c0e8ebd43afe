//! The two pipeline stages driven by the binary.
//!
//! `process` normalises every configured dataset into the aux directory.
//! `select` reads those tables back and writes the consensus outputs.

use std::sync::Arc;

use anyhow::Context;
use kinsel_ingestion::normalise::{ResolutionScheduler, SymbolResolver};
use kinsel_ingestion::sources::GeneNamespace;
use kinsel_ingestion::table_io::{read_canonical_table, read_raw_table, write_canonical_table, write_rank_table, write_symbol_list};
use kinsel_ingestion::{DatasetNormaliser, NormalisationReport};
use kinsel_ranker::{consensus_set, dose_escalation, flagged_symbols, fuse_ranks, FusionTable};
use tracing::{info, warn};

use crate::config::{Config, FusionTableSpec};

pub const CONSENSUS_FILE: &str = "intersect.txt";
pub const RANK_FILE: &str = "rank.tsv";
pub const DOSE_ESCALATION_FILE: &str = "dose_escalation.txt";

/// Outputs of a `select` run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub consensus: Vec<String>,
    pub ranks: Vec<(String, f64)>,
    pub dose_flagged: Option<Vec<String>>,
}

/// Normalise the configured datasets (all of them when `only` is empty)
/// and write each to `<aux_dir>/<name>.csv` with a JSON report beside it.
pub async fn process(
    config: &Config,
    namespace: Arc<dyn GeneNamespace>,
    only: &[String],
) -> anyhow::Result<Vec<NormalisationReport>> {
    for name in only {
        if config.dataset(name).is_none() {
            anyhow::bail!("unknown dataset '{}'", name);
        }
    }

    std::fs::create_dir_all(&config.paths.aux_dir)
        .with_context(|| format!("creating {}", config.paths.aux_dir.display()))?;

    let resolver = SymbolResolver::new(namespace, config.entrez.single_candidate_fallback);
    let scheduler = ResolutionScheduler::new(resolver);
    let normaliser = DatasetNormaliser::new(&scheduler, config.entrez.concurrency);

    let mut reports = Vec::new();
    for spec in config.datasets.iter().filter(|d| only.is_empty() || only.contains(&d.name)) {
        let source = config.paths.source_table(spec);
        info!(dataset = %spec.name, path = %source.display(), "Processing dataset");

        let raw = read_raw_table(&source, spec).with_context(|| format!("reading {}", source.display()))?;
        let normalised = normaliser
            .normalise(spec, &raw)
            .await
            .with_context(|| format!("normalising {}", spec.name))?;

        let output = config.paths.aux_table(&spec.name);
        write_canonical_table(&output, &normalised.table)?;
        let report_path = output.with_extension("report.json");
        std::fs::write(&report_path, serde_json::to_string_pretty(&normalised.report)?)?;
        info!(dataset = %spec.name, path = %output.display(), rows = normalised.table.len(), "Wrote normalised table");

        reports.push(normalised.report);
    }
    Ok(reports)
}

/// Read one aux table and turn it into fusion input, dropping the
/// records that carry no symbol.
fn load_fusion_table(config: &Config, table: &FusionTableSpec) -> anyhow::Result<FusionTable> {
    let path = config.paths.aux_table(&table.dataset);
    let canonical = read_canonical_table(&path, &table.dataset)
        .with_context(|| format!("reading {} (run `kinsel process` first)", path.display()))?;

    let excluded: Vec<&str> = canonical.unresolved().map(|r| r.original_label.as_str()).collect();
    if !excluded.is_empty() {
        warn!(dataset = %table.dataset, count = excluded.len(), labels = ?excluded, "Excluding unresolved targets from fusion");
    }

    Ok(FusionTable::new(
        &canonical.without_unresolved(),
        table.scheme,
        &table.probe_column,
        &table.reference_column,
    )?)
}

/// Consensus set and rank fusion over the configured fusion tables, plus
/// the dose-escalation screen when configured. Results go to `results_dir`.
pub fn select(config: &Config) -> anyhow::Result<Selection> {
    if config.fusion.tables.is_empty() {
        anyhow::bail!("no [[fusion.tables]] configured");
    }
    let results = &config.paths.results_dir;
    std::fs::create_dir_all(results).with_context(|| format!("creating {}", results.display()))?;

    let tables = config
        .fusion
        .tables
        .iter()
        .map(|t| load_fusion_table(config, t))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let consensus = consensus_set(&tables, config.fusion.mode, &config.fusion.thresholds)?;
    write_symbol_list(&results.join(CONSENSUS_FILE), &consensus)?;
    info!(targets = ?consensus, "Consensus targets");

    let ranks = fuse_ranks(&tables)?;
    write_rank_table(&results.join(RANK_FILE), &ranks)?;
    if let Some((top, score)) = ranks.first() {
        info!(candidates = ranks.len(), top = %top, score, "Rank fusion written");
    }

    let dose_flagged = match &config.dose_escalation {
        Some(dose) => {
            let low = read_canonical_table(&config.paths.aux_table(&dose.low), &dose.low)?;
            let high = read_canonical_table(&config.paths.aux_table(&dose.high), &dose.high)?;
            let rows = dose_escalation(&low, &high, &dose.column, dose.threshold)?;
            let flagged = flagged_symbols(&rows);
            write_symbol_list(&results.join(DOSE_ESCALATION_FILE), &flagged)?;
            info!(targets = ?flagged, "Dose escalation targets");
            Some(flagged)
        }
        None => None,
    };

    Ok(Selection { consensus, ranks, dose_flagged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::config::{DoseConfig, FusionConfig, PathsConfig};
    use kinsel_common::{DatasetSpec, MeasurementScheme};
    use kinsel_ingestion::sources::entrez::EntrezConfig;
    use kinsel_ingestion::sources::MockGeneNamespace;
    use kinsel_ranker::{BooleanMode, Thresholds};
    use pretty_assertions::assert_eq;

    fn config(root: &Path) -> Config {
        let mut huang = DatasetSpec::new("Huang", "Huang.csv", &["STF1081", "HTH01091"]);
        huang.overrides.insert("IR".to_string(), String::new());
        huang.overrides.insert("PINK".to_string(), "PINK1".to_string());

        let annes100 = DatasetSpec::new("Annes100", "Annes100.csv", &["STF1081", "STF1285"]);
        let annes500 = DatasetSpec::new("Annes500", "Annes500.csv", &["STF1081", "STF1285"]);

        Config {
            entrez: EntrezConfig::new("lab@example.org"),
            paths: PathsConfig {
                data_dir: root.join("data"),
                aux_dir: root.join("data_aux"),
                results_dir: root.join("results"),
            },
            fusion: FusionConfig {
                mode: BooleanMode::RelativeDifference,
                thresholds: Thresholds::default(),
                tables: vec![
                    FusionTableSpec {
                        dataset: "Huang".to_string(),
                        scheme: MeasurementScheme::PercentActivityRemaining,
                        probe_column: "STF1081".to_string(),
                        reference_column: "HTH01091".to_string(),
                    },
                    FusionTableSpec {
                        dataset: "Annes100".to_string(),
                        scheme: MeasurementScheme::PercentOfControl,
                        probe_column: "STF1081".to_string(),
                        reference_column: "STF1285".to_string(),
                    },
                ],
            },
            dose_escalation: Some(DoseConfig {
                low: "Annes100".to_string(),
                high: "Annes500".to_string(),
                column: "STF1285".to_string(),
                threshold: 50.0,
            }),
            datasets: vec![huang, annes100, annes500],
        }
    }

    fn write_inputs(root: &Path) {
        let data = root.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(
            data.join("Huang.csv"),
            "Name,STF1081,HTH01091\nAAK1,5,90\nPINK,10,95\nGAK,50,60\nIR,1,99\n",
        )
        .unwrap();
        std::fs::write(
            data.join("Annes100.csv"),
            "Name,STF1081,STF1285\nAAK1,2,80\nPINK1,3,70\nGAK,4,90\n",
        )
        .unwrap();
        std::fs::write(
            data.join("Annes500.csv"),
            "Name,STF1081,STF1285\nAAK1,2,10\nPINK1,3,60\nGAK,4,85\n",
        )
        .unwrap();
    }

    fn namespace() -> Arc<dyn GeneNamespace> {
        Arc::new(
            MockGeneNamespace::new()
                .with("AAK1", "22848", "AAK1", &[])
                .with("GAK", "2580", "GAK", &[])
                .with("PINK1", "65018", "PINK1", &["PARK6"])
                .with("IR", "3643", "INSR", &["CD220"])
                .with("IR", "3645", "INSRR", &["IRR"]),
        )
    }

    #[tokio::test]
    async fn test_process_then_select() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let config = config(dir.path());

        let reports = process(&config, namespace(), &[]).await.unwrap();
        assert_eq!(reports.len(), 3);
        let huang = &reports[0];
        assert_eq!(huang.unresolved, vec!["IR".to_string()]);
        assert!(config.paths.aux_table("Huang").exists());
        assert!(config.paths.aux_dir.join("Huang.report.json").exists());

        let selection = select(&config).unwrap();
        // GAK: Huang diff 10 is below threshold.
        assert_eq!(selection.consensus, vec!["AAK1", "PINK1"]);
        let ranked: Vec<&str> = selection.ranks.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(ranked, vec!["AAK1", "GAK", "PINK1"]);
        assert_eq!(selection.dose_flagged, Some(vec!["AAK1".to_string()]));

        let intersect = std::fs::read_to_string(config.paths.results_dir.join(CONSENSUS_FILE)).unwrap();
        assert_eq!(intersect, "AAK1\nPINK1\n");
        let rank = std::fs::read_to_string(config.paths.results_dir.join(RANK_FILE)).unwrap();
        assert!(rank.starts_with("GeneSymbol\trank\nAAK1\t"));
    }

    #[tokio::test]
    async fn test_process_single_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let config = config(dir.path());

        let reports = process(&config, namespace(), &["Annes500".to_string()]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!config.paths.aux_table("Huang").exists());

        assert!(process(&config, namespace(), &["Davis".to_string()]).await.is_err());
    }

    #[test]
    fn test_select_without_aux_tables_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let err = select(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("kinsel process"));
    }
}
