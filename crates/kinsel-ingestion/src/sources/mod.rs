//! Gene-name namespace clients.

pub mod entrez;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kinsel_common::{KinselError, Result};

/// One gene record returned by a namespace query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneCandidate {
    /// Opaque namespace identifier (NCBI Gene ID)
    pub id: String,
    /// Official gene symbol
    pub name: String,
    /// Other aliases registered for the gene
    pub aliases: Vec<String>,
}

impl GeneCandidate {
    /// Exact, case-sensitive match against the symbol or any alias.
    pub fn matches(&self, term: &str) -> bool {
        self.name == term || self.aliases.iter().any(|a| a == term)
    }
}

/// Common interface for gene-name namespaces.
///
/// Implementations return every live human gene the namespace associates
/// with `term`, in namespace order. Transport failures must be reported as
/// `KinselError::LookupFailed`, never as an empty result.
#[async_trait]
pub trait GeneNamespace: Send + Sync {
    async fn query(&self, term: &str) -> Result<Vec<GeneCandidate>>;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// In-memory namespace with optional per-term latency and failures.
#[derive(Default)]
pub struct MockGeneNamespace {
    data: HashMap<String, Vec<GeneCandidate>>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MockGeneNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate returned for `term`.
    pub fn with(mut self, term: &str, id: &str, name: &str, aliases: &[&str]) -> Self {
        self.data.entry(term.to_string()).or_default().push(GeneCandidate {
            id: id.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn with_delay(mut self, term: &str, delay: Duration) -> Self {
        self.delays.insert(term.to_string(), delay);
        self
    }

    /// Make every query for `term` fail as if the service rejected it.
    pub fn failing(mut self, term: &str) -> Self {
        self.failing.insert(term.to_string());
        self
    }

    /// Number of queries served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeneNamespace for MockGeneNamespace {
    async fn query(&self, term: &str) -> Result<Vec<GeneCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(term) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(term) {
            return Err(KinselError::lookup_failed(term, "HTTP 429 Too Many Requests"));
        }
        Ok(self.data.get(term).cloned().unwrap_or_default())
    }
}
