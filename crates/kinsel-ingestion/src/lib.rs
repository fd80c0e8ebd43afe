//! kinsel-ingestion: Selectivity dataset ingestion and gene-symbol normalisation.
//! - Delimited table I/O
//! - Entrez Gene namespace client
//! - Symbol resolution (single term and concurrent batches)
//! - Per-dataset normalisation pipeline
//! - Condensation of rows sharing a symbol

pub mod sources;
pub mod dedup;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod table_io;

pub use pipeline::{DatasetNormaliser, NormalisationReport, NormalisedDataset};
