//! Line-oriented HTTP source
//!
//! Covers the common shape of REST lookups: `GET` a URL built from the key,
//! then read one candidate per non-empty body line. Which column of a line
//! holds the answer, and which prefix to strip from it, is configuration.
//!
//! ```toml
//! url = "https://rest.kegg.jp/link/pathway/{key}"
//! field = 1
//! strip_prefix = "path:"
//! ```

use crate::error::{CacheError, CacheResult};
use crate::remote::Source;
use crate::value::{AmbiguityPolicy, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// Placeholder replaced by the lookup key
pub const KEY_PLACEHOLDER: &str = "{key}";

/// How to build requests and read answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// URL template, `{key}` is replaced by the key
    pub url: String,

    /// Extra query parameters; values may contain `{key}`
    pub query: BTreeMap<String, String>,

    /// Leading body lines to ignore (e.g. a header line)
    pub skip_lines: usize,

    /// Whitespace-separated column holding the answer (whole line when unset)
    pub field: Option<usize>,

    /// Prefix removed from every answer, when present
    pub strip_prefix: Option<String>,

    /// Policy for several candidates (shape default when unset)
    pub on_ambiguous: Option<AmbiguityPolicy>,

    /// Record an empty answer as null instead of reporting `NotFound`
    pub cache_empty: bool,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            query: BTreeMap::new(),
            skip_lines: 0,
            field: None,
            strip_prefix: None,
            on_ambiguous: None,
            cache_empty: false,
        }
    }
}

/// Source that answers lookups with HTTP `GET` requests
pub struct HttpSource {
    name: String,
    config: HttpSourceConfig,
    agent: Agent,
    user_agent: String,
}

impl HttpSource {
    /// Build a source. `contact` is sent in the `User-Agent` header so the
    /// upstream can reach whoever runs the lookups.
    pub fn new(
        name: impl Into<String>,
        config: HttpSourceConfig,
        contact: Option<&str>,
        timeout: Option<Duration>,
    ) -> CacheResult<Self> {
        let name = name.into();
        if config.url.is_empty() {
            return Err(CacheError::User(format!("http source {} has no url", name)));
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(timeout)
            .build()
            .into();
        let user_agent = match contact {
            Some(contact) => format!("tiercache/{} ({})", env!("CARGO_PKG_VERSION"), contact),
            None => format!("tiercache/{}", env!("CARGO_PKG_VERSION")),
        };

        Ok(Self {
            name,
            config,
            agent,
            user_agent,
        })
    }

    /// URL for a key, with the placeholder substituted
    pub fn url_for(&self, key: &str) -> String {
        self.config.url.replace(KEY_PLACEHOLDER, key)
    }

    /// Candidates found in a response body
    pub fn parse_body(&self, body: &str) -> Vec<String> {
        body.lines()
            .skip(self.config.skip_lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match self.config.field {
                Some(index) => line.split_whitespace().nth(index),
                None => Some(line),
            })
            .map(|answer| match &self.config.strip_prefix {
                Some(prefix) => answer.strip_prefix(prefix.as_str()).unwrap_or(answer),
                None => answer,
            })
            .map(str::to_string)
            .collect()
    }

    fn request(&self, key: &str) -> CacheResult<String> {
        let url = self.url_for(key);
        debug!("GET {}", url);

        let mut request = self.agent.get(&url).header("User-Agent", &self.user_agent);
        for (param, value) in &self.config.query {
            request = request.query(param, value.replace(KEY_PLACEHOLDER, key));
        }

        match request.call() {
            Ok(mut response) => response
                .body_mut()
                .read_to_string()
                .map_err(|e| CacheError::remote(&self.name, e.to_string())),
            Err(ureq::Error::StatusCode(404)) => Err(CacheError::not_found(
                key,
                format!("{} answered 404", self.name),
            )),
            Err(e) => Err(CacheError::remote(&self.name, e.to_string())),
        }
    }
}

impl<V: Value> Source<V> for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, key: &str) -> CacheResult<V> {
        let body = self.request(key)?;
        let candidates = self.parse_body(&body);
        let policy = self
            .config
            .on_ambiguous
            .unwrap_or(AmbiguityPolicy::default_for(V::SHAPE));
        fold_candidates(&self.name, key, candidates, policy, self.config.cache_empty)
    }
}

/// Turn candidates into a value, or `NotFound` for an empty answer unless
/// empty answers are cached as null
pub(crate) fn fold_candidates<V: Value>(
    source_name: &str,
    key: &str,
    candidates: Vec<String>,
    policy: AmbiguityPolicy,
    cache_empty: bool,
) -> CacheResult<V> {
    if candidates.is_empty() && !cache_empty {
        return Err(CacheError::not_found(
            key,
            format!("{} returned no answer", source_name),
        ));
    }
    V::from_candidates(key, candidates, policy)
}
