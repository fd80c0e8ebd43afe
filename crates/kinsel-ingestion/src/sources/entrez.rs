//! NCBI Entrez Gene client (E-utilities).
//!
//! Endpoints used:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   esummary: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi
//!
//! NCBI requires a contact e-mail on every request and rate-limits clients
//! without an API key to a few requests per second. Rejections come back as
//! HTTP 429 and are surfaced as `LookupFailed`.

use std::time::Duration;

use async_trait::async_trait;
use kinsel_common::sandbox::SandboxClient as Client;
use kinsel_common::{KinselError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{GeneCandidate, GeneNamespace};

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Organism scope of every query.
const ORGANISM: &str = "Homo sapiens";

/// `[entrez]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrezConfig {
    /// Contact address registered with NCBI
    pub email: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Simultaneous lookups. Unset means one per CPU; 1 is sequential.
    /// Around 50 NCBI starts answering 429 Too Many Requests.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Accept a lone search hit even when the term is not its symbol or alias.
    #[serde(default = "default_true")]
    pub single_candidate_fallback: bool,
}

fn default_tool()         -> String { "kinsel".to_string() }
fn default_base_url()     -> String { DEFAULT_BASE_URL.to_string() }
fn default_timeout_secs() -> u64    { 30 }
fn default_true()         -> bool   { true }

impl EntrezConfig {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            api_key: None,
            tool: default_tool(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            concurrency: None,
            single_candidate_fallback: default_true(),
        }
    }
}

pub struct EntrezGeneClient {
    client: Client,
    config: EntrezConfig,
}

impl EntrezGeneClient {
    pub fn new(config: EntrezConfig) -> Result<Self> {
        if config.email.trim().is_empty() {
            return Err(KinselError::Config("entrez.email must be set for NCBI requests".to_string()));
        }
        let mut client = Client::new(Duration::from_secs(config.timeout_secs))?;
        if let Ok(url) = url::Url::parse(&config.base_url) {
            if let Some(host) = url.host_str() {
                client.allow_domain(host);
            }
        }
        Ok(Self { client, config })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "gene".to_string()),
            ("retmode", "json".to_string()),
            ("email", self.config.email.clone()),
            ("tool", self.config.tool.clone()),
        ];
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn get_json(&self, endpoint: &str, term: &str, params: &[(&'static str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let resp = self.client
            .get(&url)?
            .query(params)
            .send()
            .await
            .map_err(|e| KinselError::lookup_failed(term, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KinselError::lookup_failed(term, format!("HTTP {}", status)));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| KinselError::lookup_failed(term, e))
    }

    /// Gene IDs matching `term` among live human genes.
    #[instrument(skip(self))]
    async fn esearch(&self, term: &str) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", search_term(term)));

        let body = self.get_json("esearch.fcgi", term, &params).await?;
        let ids = parse_esearch(&body).map_err(|reason| KinselError::lookup_failed(term, reason))?;

        debug!(?ids, "Entrez esearch returned gene IDs");
        Ok(ids)
    }

    /// Symbol and aliases for each ID, in ID order.
    #[instrument(skip(self, ids))]
    async fn esummary(&self, term: &str, ids: &[String]) -> Result<Vec<GeneCandidate>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut params = self.base_params();
        params.push(("id", ids.join(",")));

        let body = self.get_json("esummary.fcgi", term, &params).await?;
        if let Some(err) = body["error"].as_str() {
            return Err(KinselError::lookup_failed(term, err));
        }
        parse_esummary(&body, ids).map_err(|reason| KinselError::lookup_failed(term, reason))
    }
}

#[async_trait]
impl GeneNamespace for EntrezGeneClient {
    async fn query(&self, term: &str) -> Result<Vec<GeneCandidate>> {
        let ids = self.esearch(term).await?;
        self.esummary(term, &ids).await
    }
}

/// Entrez query restricted to live, established human gene records.
pub fn search_term(term: &str) -> String {
    format!("({}[gene]) AND ({}[orgn]) AND alive[prop] NOT newentry[gene]", term, ORGANISM)
}

fn parse_esearch(body: &Value) -> std::result::Result<Vec<String>, String> {
    if let Some(err) = body["error"].as_str() {
        return Err(err.to_string());
    }
    let result = &body["esearchresult"];
    if let Some(err) = result["ERROR"].as_str() {
        return Err(err.to_string());
    }
    let ids = result["idlist"]
        .as_array()
        .ok_or_else(|| "esearch response has no idlist".to_string())?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    Ok(ids)
}

/// A missing document fails the whole lookup: dropping it could leave a
/// single candidate behind and trigger the single-candidate fallback.
fn parse_esummary(body: &Value, ids: &[String]) -> std::result::Result<Vec<GeneCandidate>, String> {
    let mut candidates = Vec::with_capacity(ids.len());
    for id in ids {
        let doc = &body["result"][id.as_str()];
        if doc.is_null() || doc.get("error").is_some() {
            return Err(format!("esummary has no document for gene ID {}", id));
        }
        let name = doc["name"].as_str().unwrap_or_default().to_string();
        let aliases = doc["otheraliases"]
            .as_str()
            .unwrap_or_default()
            .split(", ")
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        candidates.push(GeneCandidate { id: id.clone(), name, aliases });
    }
    Ok(candidates)
}
