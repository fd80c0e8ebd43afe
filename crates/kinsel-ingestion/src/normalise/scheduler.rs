//! Concurrent batch resolution.
//!
//! Terms are deduplicated, dispatched to the resolver through a bounded
//! ordered buffer of in-flight lookups, and mapped back so that
//! `symbols[i]` always belongs to `terms[i]`, whatever order the lookups
//! complete in. The call returns once every lookup has finished.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use kinsel_common::{ResolutionResult, Result};
use tracing::{info, warn};

use super::SymbolResolver;

/// A term whose lookup failed; it resolves to the empty symbol.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LookupFailure {
    pub term: String,
    pub reason: String,
}

/// Outcome of one batch, index-aligned with the input terms.
#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    pub symbols: Vec<String>,
    pub failures: Vec<LookupFailure>,
}

impl BatchResolution {
    pub fn unresolved_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_empty()).count()
    }
}

pub struct ResolutionScheduler {
    resolver: SymbolResolver,
}

impl ResolutionScheduler {
    pub fn new(resolver: SymbolResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    /// Resolve every term to one official symbol ("" when unresolved).
    ///
    /// `concurrency`: `None` uses one lookup slot per CPU, `Some(1)` runs
    /// the lookups one after another.
    pub async fn resolve_all(&self, terms: &[String], concurrency: Option<usize>) -> BatchResolution {
        let workers = concurrency.unwrap_or_else(num_cpus::get).max(1);

        let mut unique: Vec<&str> = Vec::new();
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for term in terms {
            slot.entry(term.as_str()).or_insert_with(|| {
                unique.push(term.as_str());
                unique.len() - 1
            });
        }

        info!(terms = terms.len(), unique = unique.len(), workers, "Resolving gene symbols");

        let outcomes: Vec<Result<ResolutionResult>> = if workers == 1 {
            let mut out = Vec::with_capacity(unique.len());
            for term in &unique {
                out.push(self.resolver.resolve(term).await);
            }
            out
        } else {
            stream::iter(unique.iter().copied())
                .map(|term| self.resolver.resolve(term))
                .buffered(workers)
                .collect()
                .await
        };

        let mut failures = Vec::new();
        let resolved: Vec<String> = unique
            .iter()
            .zip(outcomes)
            .map(|(term, outcome)| match outcome {
                Ok(result) => choose_symbol(term, &result),
                Err(e) => {
                    warn!(term, error = %e, "Gene symbol lookup failed");
                    failures.push(LookupFailure { term: term.to_string(), reason: e.to_string() });
                    String::new()
                }
            })
            .collect();

        let symbols: Vec<String> = terms
            .iter()
            .map(|t| resolved[slot[t.as_str()]].clone())
            .collect();

        if !failures.is_empty() {
            warn!(failed = failures.len(), "Some lookups failed and were left unresolved");
        }

        BatchResolution { symbols, failures }
    }
}

/// Pick one symbol for `term`: nothing → "", the term itself when it is
/// among the names, otherwise the first name returned.
pub fn choose_symbol(term: &str, result: &ResolutionResult) -> String {
    if result.names.is_empty() {
        String::new()
    } else if result.names.iter().any(|n| n == term) {
        term.to_string()
    } else {
        result.names[0].clone()
    }
}
