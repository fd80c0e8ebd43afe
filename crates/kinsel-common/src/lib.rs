//! kinsel-common: Shared types, errors, and configuration used across all kinsel crates.

pub mod error;
pub mod entities;
pub mod dataset_config;
pub mod sandbox;

// Re-export commonly used types
pub use dataset_config::{Aggregation, ConfidencePolicy, DatasetSpec, MeasurementScheme};
pub use entities::{CanonicalRecord, CanonicalTable, ResolutionResult};
pub use error::{KinselError, Result};
