//! kinsel-ranker: Cross-dataset target selection.
//! Flags targets per dataset, intersects the flags across datasets, and
//! fuses per-dataset rank positions into a consensus ordering.

pub mod dose;
pub mod fusion;
pub mod normalise;
pub mod thresholds;

pub use dose::{dose_escalation, flagged_symbols, DoseEscalation, DEFAULT_ESCALATION_THRESHOLD};
pub use fusion::{consensus_set, fuse_ranks, FusionEntry, FusionTable, RankedTarget};
pub use thresholds::{BooleanMode, Thresholds};
