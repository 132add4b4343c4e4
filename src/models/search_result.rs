use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::aggregations::Aggregations;

/// One page of a search, scroll or scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_scroll_id", default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    #[serde(rename = "pit_id", default, skip_serializing_if = "Option::is_none")]
    pub pit_id: Option<String>,
    #[serde(rename = "_shards", default, skip_serializing_if = "Option::is_none")]
    pub shards: Option<ShardsInfo>,
    #[serde(default)]
    pub hits: SearchHits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest: Option<Map<String, Value>>,
}

impl SearchResult {
    /// Total number of matching documents, 0 if the engine omitted it.
    pub fn total_hits(&self) -> u64 {
        self.hits.total.as_ref().map(TotalHits::value).unwrap_or(0)
    }

    /// Number of hits on this page.
    pub fn len(&self) -> usize {
        self.hits.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.hits.is_empty()
    }

    /// Scroll id, treating an empty string as absent.
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Decodes every hit's `_source` into `T`, skipping hits without one.
    pub fn sources_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| hit.source_as().transpose())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardsInfo {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    #[serde(default)]
    pub skipped: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// `hits.total` is a plain number before Elasticsearch 7 and an object since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object {
        value: u64,
        #[serde(default = "default_relation")]
        relation: String,
    },
}

fn default_relation() -> String {
    "eq".to_string()
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(value) | TotalHits::Object { value, .. } => *value,
        }
    }

    /// True when the engine stopped counting and `value` is a lower bound.
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, TotalHits::Object { relation, .. } if relation == "gte")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_routing", default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Map<String, Value>>,
}

impl SearchHit {
    /// Decodes `_source` into `T`; `None` if the hit has no source.
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.source {
            Some(source) => Ok(Some(T::deserialize(source)?)),
            None => Ok(None),
        }
    }
}
