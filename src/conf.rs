use std::time::Duration;

use twelf::config;
use twelf::reexports::serde::{Deserialize, Serialize};

use crate::reindexer::DEFAULT_BULK_SIZE;
use crate::scroll::DEFAULT_KEEP_ALIVE;

/// Configuration file of the `es-fluent-reindex` binary.
#[config]
#[derive(Debug, Default)]
pub struct Config {
    endpoints: Vec<Endpoint>,
    jobs: Vec<ReindexJob>,
}

/// A cluster the client can talk to.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    name: String,
    url: String,
    #[serde(default)]
    basic_auth: Option<BasicAuth>,
    #[serde(default)]
    root_certificates: Vec<String>,
    /// Whole seconds, kept for existing config files.
    #[serde(default)]
    timeout_secs: Option<u64>,
    /// Takes precedence over `timeout_secs`.
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default = "default_max_retries")]
    max_retries: usize,
    #[serde(default)]
    insecure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BasicAuth {
    username: String,
    #[serde(default)]
    password: Option<String>,
}

/// One source index copied into one target index.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReindexJob {
    from: String,
    to: String,
    index: String,
    index_of_copy: String,
    #[serde(default = "default_bulk_size")]
    bulk_size: usize,
    #[serde(default)]
    scroll_size: Option<usize>,
    #[serde(default = "default_keep_alive")]
    keep_alive: String,
    /// Raw JSON query applied to the source index.
    #[serde(default)]
    query: Option<String>,
    #[serde(default = "default_true")]
    stats_only: bool,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_max_retries() -> usize {
    3
}

fn default_bulk_size() -> usize {
    DEFAULT_BULK_SIZE
}

fn default_keep_alive() -> String {
    DEFAULT_KEEP_ALIVE.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn get_endpoints(&self) -> &Vec<Endpoint> {
        &self.endpoints
    }
    pub fn get_jobs(&self) -> &Vec<ReindexJob> {
        &self.jobs
    }
    pub fn find_endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| endpoint.name == name)
    }
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
    pub fn get_username(&self) -> &String {
        &self.username
    }
    pub fn get_password(&self) -> &Option<String> {
        &self.password
    }
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            basic_auth: None,
            root_certificates: Vec::new(),
            timeout_secs: None,
            timeout_ms: None,
            max_retries: default_max_retries(),
            insecure: false,
        }
    }

    pub fn with_basic_auth(mut self, basic_auth: BasicAuth) -> Self {
        self.basic_auth = Some(basic_auth);
        self
    }

    pub fn with_root_certificate(mut self, path: impl Into<String>) -> Self {
        self.root_certificates.push(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = None;
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn get_name(&self) -> &String {
        &self.name
    }
    pub fn get_url(&self) -> &String {
        &self.url
    }
    pub fn get_root_certificates(&self) -> &Vec<String> {
        &self.root_certificates
    }
    pub fn get_timeout(&self) -> Duration {
        match (self.timeout_ms, self.timeout_secs) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Some(secs)) => Duration::from_secs(secs),
            (None, None) => DEFAULT_TIMEOUT,
        }
    }
    pub fn get_max_retries(&self) -> usize {
        self.max_retries
    }
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }
    pub fn is_basic_auth(&self) -> bool {
        self.basic_auth.is_some()
    }
    pub fn get_username(&self) -> String {
        if let Some(basic_auth) = &self.basic_auth {
            basic_auth.get_username().clone()
        } else {
            String::default()
        }
    }
    pub fn get_password(&self) -> Option<String> {
        if let Some(basic_auth) = &self.basic_auth {
            return basic_auth.get_password().clone();
        }
        None
    }
}

impl ReindexJob {
    pub fn get_from(&self) -> &String {
        &self.from
    }
    pub fn get_to(&self) -> &String {
        &self.to
    }
    pub fn get_index(&self) -> &String {
        &self.index
    }
    pub fn get_index_of_copy(&self) -> &String {
        &self.index_of_copy
    }
    pub fn get_bulk_size(&self) -> usize {
        self.bulk_size
    }
    pub fn get_scroll_size(&self) -> Option<usize> {
        self.scroll_size
    }
    pub fn get_keep_alive(&self) -> &String {
        &self.keep_alive
    }
    pub fn get_query(&self) -> &Option<String> {
        &self.query
    }
    pub fn is_stats_only(&self) -> bool {
        self.stats_only
    }
}
