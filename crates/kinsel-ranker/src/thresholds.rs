//! Thresholds for turning kinase activity measurements into flags.

use kinsel_common::{KinselError, Result};
use serde::{Deserialize, Serialize};

/// How a dataset's two measurements become a per-target flag.
/// One mode applies to every dataset in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanMode {
    /// Flag when the less toxic compound leaves the target markedly more
    /// active than the probe (fold change for Kd data, difference for
    /// percentages).
    #[default]
    RelativeDifference,
    /// Flag when the probe inhibits the target and the less toxic compound
    /// does not, judged against absolute cut-offs.
    AbsoluteThreshold,
}

/// Per-scheme comparison thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum difference in % control / % activity remaining between the
    /// less toxic compound and the probe
    #[serde(default = "default_diff_percent")]
    pub diff_percent_threshold: f64,
    /// Minimum fold difference in apparent Kd
    #[serde(default = "default_diff_fold")]
    pub diff_fold_threshold: f64,
    /// Percentage at or below which the probe counts as inhibiting
    #[serde(default = "default_min_percent")]
    pub min_percent_threshold: f64,
    /// Percentage at or above which the less toxic compound counts as not inhibiting
    #[serde(default = "default_max_percent")]
    pub max_percent_threshold: f64,
}

fn default_diff_percent() -> f64 { 20.0 }
fn default_diff_fold()    -> f64 { 20.0 }
fn default_min_percent()  -> f64 { 25.0 }
fn default_max_percent()  -> f64 { 75.0 }

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            diff_percent_threshold: default_diff_percent(),
            diff_fold_threshold:    default_diff_fold(),
            min_percent_threshold:  default_min_percent(),
            max_percent_threshold:  default_max_percent(),
        }
    }
}

impl Thresholds {
    /// All thresholds finite and non-negative, min below max.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("diff_percent_threshold", self.diff_percent_threshold),
            ("diff_fold_threshold", self.diff_fold_threshold),
            ("min_percent_threshold", self.min_percent_threshold),
            ("max_percent_threshold", self.max_percent_threshold),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                return Err(KinselError::Config(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }
        if self.min_percent_threshold >= self.max_percent_threshold {
            return Err(KinselError::Config(format!(
                "min_percent_threshold ({}) must be below max_percent_threshold ({})",
                self.min_percent_threshold, self.max_percent_threshold
            )));
        }
        Ok(())
    }
}
