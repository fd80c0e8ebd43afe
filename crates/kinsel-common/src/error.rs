use thiserror::Error;

#[derive(Debug, Error)]
pub enum KinselError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transient network/service failure for a single lookup term.
    #[error("Lookup failed for '{term}': {reason}")]
    LookupFailed { term: String, reason: String },

    #[error("Unresolved gene symbol for label '{label}' in table '{table}'")]
    UnresolvedSymbol { table: String, label: String },

    #[error("Duplicate gene symbol '{symbol}' in table '{table}' after condensation")]
    DuplicateSymbol { table: String, symbol: String },

    #[error("Invalid measurement in table '{table}': label '{label}', column '{column}', value '{value}'")]
    InvalidMeasurement {
        table: String,
        label: String,
        column: String,
        value: String,
    },

    #[error("Structural configuration error: {0}")]
    StructuralConfig(String),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinselError {
    pub fn lookup_failed(term: &str, reason: impl ToString) -> Self {
        Self::LookupFailed {
            term: term.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that only affect a single lookup term.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::LookupFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, KinselError>;
