//! On-demand parsing of the `aggregations` section of a search reply.
//!
//! The engine returns aggregations as untyped JSON keyed by the name the
//! caller chose. [`Aggregations`] keeps that JSON and decodes one entry at a
//! time into the shape the caller asks for. Every accessor returns
//! `Ok(None)` when no aggregation of that name exists and an error when it
//! exists but has a different shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::search_result::SearchHits;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregations(pub Map<String, Value>);

impl Aggregations {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.0.get(name) {
            Some(raw) => Ok(Some(T::deserialize(raw)?)),
            None => Ok(None),
        }
    }

    /// min, max, sum, avg, value_count, cardinality.
    pub fn value_metric(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.parse(name)
    }

    pub fn min(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn max(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn sum(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn avg(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn value_count(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn cardinality(&self, name: &str) -> Result<Option<ValueMetric>> {
        self.value_metric(name)
    }

    pub fn stats(&self, name: &str) -> Result<Option<StatsMetric>> {
        self.parse(name)
    }

    /// terms, significant_terms, histogram, date_histogram, range.
    pub fn buckets(&self, name: &str) -> Result<Option<BucketKeyItems>> {
        self.parse(name)
    }

    pub fn terms(&self, name: &str) -> Result<Option<BucketKeyItems>> {
        self.buckets(name)
    }

    pub fn histogram(&self, name: &str) -> Result<Option<BucketKeyItems>> {
        self.buckets(name)
    }

    pub fn date_histogram(&self, name: &str) -> Result<Option<BucketKeyItems>> {
        self.buckets(name)
    }

    /// filter, missing, global, nested.
    pub fn single_bucket(&self, name: &str) -> Result<Option<SingleBucket>> {
        self.parse(name)
    }

    pub fn filter(&self, name: &str) -> Result<Option<SingleBucket>> {
        self.single_bucket(name)
    }

    pub fn missing(&self, name: &str) -> Result<Option<SingleBucket>> {
        self.single_bucket(name)
    }

    pub fn global(&self, name: &str) -> Result<Option<SingleBucket>> {
        self.single_bucket(name)
    }

    pub fn top_hits(&self, name: &str) -> Result<Option<TopHits>> {
        self.parse(name)
    }
}

/// Single-value metric. `value` is `None` when no document had the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMetric {
    pub value: Option<f64>,
    #[serde(default)]
    pub value_as_string: Option<String>,
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsMetric {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketKeyItems {
    #[serde(default)]
    pub doc_count_error_upper_bound: Option<i64>,
    #[serde(default)]
    pub sum_other_doc_count: Option<i64>,
    pub buckets: Vec<BucketKeyItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketKeyItem {
    /// String for terms, number for histograms.
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    /// Sub-aggregations of this bucket.
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

impl BucketKeyItem {
    /// Key as a string, for both string and numeric keys.
    pub fn key_string(&self) -> String {
        match (&self.key_as_string, &self.key) {
            (Some(s), _) => s.clone(),
            (None, Value::String(s)) => s.clone(),
            (None, other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleBucket {
    pub doc_count: u64,
    #[serde(flatten)]
    pub aggregations: Aggregations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopHits {
    pub hits: SearchHits,
}
