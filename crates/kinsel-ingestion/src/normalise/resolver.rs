//! Official gene symbol resolution for a single term.
//!
//! Queries a `GeneNamespace` and keeps the candidates whose symbol or alias
//! is exactly the query term. Historical names often hit exactly one gene
//! without being listed as an alias of it; with the single-candidate
//! fallback enabled such a lone hit is accepted anyway.
//!
//! Usage:
//! ```ignore
//! let resolver = SymbolResolver::new(Arc::new(EntrezGeneClient::new(cfg)?), true);
//! let res = resolver.resolve("p38 alpha").await?;  // names: ["MAPK14"], ids: ["1432"]
//! ```

use std::sync::Arc;

use kinsel_common::{ResolutionResult, Result};
use tracing::debug;

use crate::sources::GeneNamespace;

/// Stateless resolver over a shared namespace client.
#[derive(Clone)]
pub struct SymbolResolver {
    namespace: Arc<dyn GeneNamespace>,
    single_candidate_fallback: bool,
}

impl SymbolResolver {
    pub fn new(namespace: Arc<dyn GeneNamespace>, single_candidate_fallback: bool) -> Self {
        Self { namespace, single_candidate_fallback }
    }

    pub fn single_candidate_fallback(&self) -> bool {
        self.single_candidate_fallback
    }

    /// Resolve `term` to zero or more official symbols, in namespace order.
    ///
    /// Errors only when the namespace query itself fails; an empty result
    /// means the namespace answered and nothing matched.
    pub async fn resolve(&self, term: &str) -> Result<ResolutionResult> {
        let candidates = self.namespace.query(term).await?;

        let mut result = ResolutionResult::empty();
        for candidate in candidates.iter().filter(|c| c.matches(term)) {
            result.push(&candidate.name, &candidate.id);
        }

        if self.single_candidate_fallback && result.is_empty() && candidates.len() == 1 {
            let only = &candidates[0];
            debug!(term, symbol = %only.name, "Accepting single indirect match");
            result.push(&only.name, &only.id);
        }

        Ok(result)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
