use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ErrorDetails;

/// Reply of the `_bulk` endpoint.
///
/// `items` has one entry per submitted action, in submission order. A reply
/// with failed items is still a successful call; inspect [`failed`](Self::failed).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkResponseEntry>,
}

/// One `{"<action>": {...}}` element of the bulk reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, BulkResponseItem>")]
pub struct BulkResponseEntry {
    pub action: String,
    pub item: BulkResponseItem,
}

impl TryFrom<BTreeMap<String, BulkResponseItem>> for BulkResponseEntry {
    type Error = String;

    fn try_from(map: BTreeMap<String, BulkResponseItem>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "bulk item must have exactly one action, found {}",
                map.len()
            ));
        }
        let (action, item) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty bulk item".to_string())?;
        if item.error.is_some() {
            debug!("bulk {} of {} failed: {:?}", action, item.id, item.error);
        }
        Ok(Self { action, item })
    }
}

/// Outcome of one bulk action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponseItem {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub status: u16,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default, skip_serializing_if = "Option::is_none")]
    pub primary_term: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_refresh: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

impl BulkResponseItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl BulkResponse {
    /// Items of the given action (`index`, `create`, `update`, `delete`).
    pub fn by_action(&self, action: &str) -> Vec<&BulkResponseItem> {
        self.items
            .iter()
            .filter(|entry| entry.action == action)
            .map(|entry| &entry.item)
            .collect()
    }

    pub fn indexed(&self) -> Vec<&BulkResponseItem> {
        self.by_action("index")
    }

    pub fn created(&self) -> Vec<&BulkResponseItem> {
        self.by_action("create")
    }

    pub fn updated(&self) -> Vec<&BulkResponseItem> {
        self.by_action("update")
    }

    pub fn deleted(&self) -> Vec<&BulkResponseItem> {
        self.by_action("delete")
    }

    /// Items for document `id`, across all actions.
    pub fn by_id(&self, id: &str) -> Vec<&BulkResponseItem> {
        self.items
            .iter()
            .filter(|entry| entry.item.id == id)
            .map(|entry| &entry.item)
            .collect()
    }

    /// Items with a non-2xx status.
    pub fn failed(&self) -> Vec<&BulkResponseItem> {
        self.items
            .iter()
            .map(|entry| &entry.item)
            .filter(|item| !item.is_success())
            .collect()
    }

    /// Items with a 2xx status.
    pub fn succeeded(&self) -> Vec<&BulkResponseItem> {
        self.items
            .iter()
            .map(|entry| &entry.item)
            .filter(|item| item.is_success())
            .collect()
    }
}
