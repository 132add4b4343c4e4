use semver::Version as Semver;
use serde::{Deserialize, Serialize};

use crate::error::{EsError, Result};

/// Reply of `GET /`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerInfo {
    #[serde(rename = "name")]
    hostname: String,
    #[serde(rename = "cluster_name")]
    name: String,
    #[serde(rename = "cluster_uuid", default)]
    uuid: Option<String>,
    version: Version,
    #[serde(default)]
    tagline: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Version {
    number: String,
    #[serde(default)]
    distribution: Option<String>,
    lucene_version: String,
}

impl ServerInfo {
    pub fn get_hostname(&self) -> &String {
        &self.hostname
    }
    pub fn get_name(&self) -> &String {
        &self.name
    }
    pub fn get_uuid(&self) -> &Option<String> {
        &self.uuid
    }
    pub fn get_version(&self) -> &String {
        &self.version.number
    }
    pub fn get_lucene_version(&self) -> &String {
        &self.version.lucene_version
    }
    /// `opensearch` for OpenSearch clusters, `None` for Elasticsearch.
    pub fn get_distribution(&self) -> Option<&str> {
        self.version.distribution.as_deref()
    }

    /// Parsed version number. Pre-release suffixes such as `-SNAPSHOT` are kept.
    pub fn get_semver(&self) -> Result<Semver> {
        Semver::parse(&self.version.number).map_err(|e| {
            EsError::UnexpectedResponse(format!(
                "invalid version number {:?}: {}",
                self.version.number, e
            ))
        })
    }

    pub fn get_version_major(&self) -> Result<u64> {
        Ok(self.get_semver()?.major)
    }
}
