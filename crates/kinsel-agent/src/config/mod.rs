//! Configuration loading for Kinsel.
//! Reads kinsel.toml from the current directory or path in KINSEL_CONFIG env var.

use kinsel_common::{DatasetSpec, MeasurementScheme};
use kinsel_ingestion::sources::entrez::EntrezConfig;
use kinsel_ranker::{BooleanMode, Thresholds, DEFAULT_ESCALATION_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub entrez: EntrezConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub dose_escalation: Option<DoseConfig>,
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source study tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Normalised tables written by `process`, read by `select`
    #[serde(default = "default_aux_dir")]
    pub aux_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_data_dir()    -> PathBuf { PathBuf::from("data") }
fn default_aux_dir()     -> PathBuf { PathBuf::from("data_aux") }
fn default_results_dir() -> PathBuf { PathBuf::from("results") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            aux_dir: default_aux_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl PathsConfig {
    pub fn source_table(&self, spec: &DatasetSpec) -> PathBuf {
        self.data_dir.join(&spec.file)
    }

    pub fn aux_table(&self, dataset: &str) -> PathBuf {
        self.aux_dir.join(format!("{}.csv", dataset))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub mode: BooleanMode,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub tables: Vec<FusionTableSpec>,
}

/// One dataset taking part in fusion, and how to read its two compounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionTableSpec {
    pub dataset: String,
    pub scheme: MeasurementScheme,
    /// Compound whose toxicity is being explained
    pub probe_column: String,
    /// Less toxic comparator compound
    pub reference_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseConfig {
    pub low: String,
    pub high: String,
    pub column: String,
    #[serde(default = "default_escalation_threshold")]
    pub threshold: f64,
}

fn default_escalation_threshold() -> f64 { DEFAULT_ESCALATION_THRESHOLD }

mod tests;

impl Config {
    /// Load configuration from kinsel.toml.
    /// Checks KINSEL_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("KINSEL_CONFIG")
            .unwrap_or_else(|_| "kinsel.toml".to_string());

        if !Path::new(&path).exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy kinsel.example.toml to kinsel.toml and edit it.",
                path
            );
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Cross-section checks serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.fusion.thresholds.validate()?;

        let mut names = HashSet::new();
        for spec in &self.datasets {
            if !names.insert(spec.name.as_str()) {
                anyhow::bail!("dataset '{}' is defined twice", spec.name);
            }
            if spec.value_columns.is_empty() {
                anyhow::bail!("dataset '{}' has no value_columns", spec.name);
            }
        }

        for table in &self.fusion.tables {
            let spec = self
                .dataset(&table.dataset)
                .ok_or_else(|| anyhow::anyhow!("fusion table '{}' names an unknown dataset", table.dataset))?;
            for column in [&table.probe_column, &table.reference_column] {
                if !spec.value_columns.contains(column) {
                    anyhow::bail!("fusion table '{}': '{}' is not a value column", table.dataset, column);
                }
            }
        }

        if let Some(dose) = &self.dose_escalation {
            for name in [&dose.low, &dose.high] {
                let spec = self
                    .dataset(name)
                    .ok_or_else(|| anyhow::anyhow!("dose_escalation names an unknown dataset '{}'", name))?;
                if !spec.value_columns.contains(&dose.column) {
                    anyhow::bail!("dose_escalation: dataset '{}' has no value column '{}'", name, dose.column);
                }
            }
        }
        Ok(())
    }
}
