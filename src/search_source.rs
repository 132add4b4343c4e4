//! Request body shared by the scroll, scan and count services.

use serde::Serialize;
use serde_json::{json, Value};
use serde_with::skip_serializing_none;

use crate::error::Result;

/// Body of a `_search` request. Only the fields a cursor needs are modelled;
/// the query itself is raw JSON.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSource {
    query: Option<Value>,
    size: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sort: Vec<Value>,
    #[serde(rename = "_source")]
    fetch_source: Option<Value>,
    stored_fields: Option<Vec<String>>,
    version: Option<bool>,
    track_total_hits: Option<Value>,
    slice: Option<Value>,
    aggs: Option<Value>,
}

impl SearchSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw query clause, e.g. `{"term": {"user": "olivere"}}`.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn get_query(&self) -> Option<&Value> {
        self.query.as_ref()
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn get_size(&self) -> Option<usize> {
        self.size
    }

    pub fn sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        let order = if ascending { "asc" } else { "desc" };
        let mut clause = serde_json::Map::new();
        clause.insert(field.into(), json!({ "order": order }));
        self.sort.push(Value::Object(clause));
        self
    }

    /// Raw sort clause, e.g. `"_doc"`.
    pub fn sort_raw(mut self, clause: Value) -> Self {
        self.sort.push(clause);
        self
    }

    pub fn has_sort(&self) -> bool {
        !self.sort.is_empty()
    }

    /// Disables `_source` on hits.
    pub fn fetch_source(mut self, enabled: bool) -> Self {
        self.fetch_source = Some(Value::Bool(enabled));
        self
    }

    pub fn fetch_source_includes_excludes(
        mut self,
        includes: Vec<String>,
        excludes: Vec<String>,
    ) -> Self {
        self.fetch_source = Some(json!({ "includes": includes, "excludes": excludes }));
        self
    }

    pub fn stored_fields(mut self, fields: Vec<String>) -> Self {
        self.stored_fields = Some(fields);
        self
    }

    pub fn version(mut self, enabled: bool) -> Self {
        self.version = Some(enabled);
        self
    }

    pub fn track_total_hits(mut self, enabled: bool) -> Self {
        self.track_total_hits = Some(Value::Bool(enabled));
        self
    }

    /// Sliced scroll: this cursor reads slice `id` of `max`.
    pub fn slice(mut self, id: u32, max: u32) -> Self {
        self.slice = Some(json!({ "id": id, "max": max }));
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, aggregation: Value) -> Self {
        let aggs = self.aggs.get_or_insert_with(|| json!({}));
        if let Value::Object(map) = aggs {
            map.insert(name.into(), aggregation);
        }
        self
    }

    /// JSON text of the body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
