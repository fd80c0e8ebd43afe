use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::KinselError;

/// Default per-request timeout. A single stalled lookup must not hold the
/// resolution batch open indefinitely.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP client that only allows requests to approved domains, with a
/// bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client allowed to reach NCBI E-utilities and localhost.
    pub fn new(timeout: Duration) -> Result<Self, KinselError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "eutils.ncbi.nlm.nih.gov", // Entrez Gene
            "localhost",               // local mirrors / test servers
            "127.0.0.1",
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("kinsel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KinselError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Lets requests reach `host` and its subdomains, e.g. a local
    /// E-utilities mirror named in `entrez.base_url`.
    pub fn allow_domain(&mut self, host: &str) {
        self.allowlist.insert(host.trim_end_matches('.').to_ascii_lowercase());
    }

    fn host_permitted(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowlist.iter().any(|entry| {
            host == *entry
                || host
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// True when the URL parses and its host is on the allowlist.
    pub fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.host_permitted(h)))
            .unwrap_or(false)
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, KinselError> {
        let parsed = Url::parse(url)
            .map_err(|e| KinselError::SecurityError(format!("refusing malformed URL {}: {}", url, e)))?;
        match parsed.host_str() {
            Some(host) if self.host_permitted(host) => Ok(self.client.get(parsed)),
            Some(host) => Err(KinselError::SecurityError(format!(
                "host '{}' is not an allowed lookup endpoint",
                host
            ))),
            None => Err(KinselError::SecurityError(format!("URL {} has no host", url))),
        }
    }
}
