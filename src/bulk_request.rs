//! Write operations that can be queued on a [`BulkService`](crate::BulkService).
//!
//! Each request renders to the lines of the bulk wire format: an action and
//! metadata line, followed by a source line for index/create/update. Rendering
//! is computed on demand from the configured fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use crate::error::{EsError, Result};

/// Document body of an index or update action.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Structured value, serialized on output.
    Json(Value),
    /// Pre-encoded JSON bytes, written verbatim.
    Raw(Vec<u8>),
    /// Pre-encoded JSON text, written verbatim.
    Encoded(String),
}

impl Document {
    pub fn from_serialize<T: Serialize + ?Sized>(doc: &T) -> Result<Self> {
        Ok(Document::Json(serde_json::to_value(doc)?))
    }

    /// JSON text of the document, on one line.
    pub fn to_json_string(&self) -> Result<String> {
        let text = match self {
            Document::Json(value) => serde_json::to_string(value)?,
            Document::Raw(bytes) => std::str::from_utf8(bytes)
                .map_err(|e| EsError::InvalidArgument(format!("document is not UTF-8: {}", e)))?
                .to_owned(),
            Document::Encoded(text) => text.clone(),
        };
        if text.contains('\n') {
            return Err(EsError::InvalidArgument(
                "pre-encoded document must not contain newlines".to_string(),
            ));
        }
        Ok(text)
    }

    /// Document as a JSON value, parsing pre-encoded variants.
    fn to_value(&self) -> Result<Value> {
        match self {
            Document::Json(value) => Ok(value.clone()),
            Document::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
            Document::Encoded(text) => Ok(serde_json::from_str(text)?),
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Document::Json(value)
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Encoded(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Encoded(text.to_owned())
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Document::Raw(bytes)
    }
}

/// Metadata object of an action line. Field order is the wire order.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: Option<&'a str>,
    #[serde(rename = "_type")]
    doc_type: Option<&'a str>,
    #[serde(rename = "_id")]
    id: Option<&'a str>,
    routing: Option<&'a str>,
    version: Option<i64>,
    version_type: Option<&'a str>,
    if_seq_no: Option<i64>,
    if_primary_term: Option<i64>,
    pipeline: Option<&'a str>,
    retry_on_conflict: Option<u32>,
}

fn action_line(action: &str, meta: &ActionMeta<'_>) -> Result<String> {
    let mut line = BTreeMap::new();
    line.insert(action, meta);
    Ok(serde_json::to_string(&line)?)
}

/// Index action, or create action when `op_type("create")` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkIndexRequest {
    index: Option<String>,
    doc_type: Option<String>,
    id: Option<String>,
    op_type: Option<String>,
    routing: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    if_seq_no: Option<i64>,
    if_primary_term: Option<i64>,
    pipeline: Option<String>,
    doc: Option<Document>,
}

impl BulkIndexRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Mapping type, only meaningful on clusters that still have types.
    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// `index` (default) or `create`.
    pub fn op_type(mut self, op_type: impl Into<String>) -> Self {
        self.op_type = Some(op_type.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// `internal`, `external` or `external_gte`.
    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    pub fn if_seq_no(mut self, seq_no: i64) -> Self {
        self.if_seq_no = Some(seq_no);
        self
    }

    pub fn if_primary_term(mut self, primary_term: i64) -> Self {
        self.if_primary_term = Some(primary_term);
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<Document>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Action line followed by the document line.
    pub fn source(&self) -> Result<Vec<String>> {
        let action = self.op_type.as_deref().unwrap_or("index");
        let meta = ActionMeta {
            index: self.index.as_deref(),
            doc_type: self.doc_type.as_deref(),
            id: self.id.as_deref(),
            routing: self.routing.as_deref(),
            version: self.version,
            version_type: self.version_type.as_deref(),
            if_seq_no: self.if_seq_no,
            if_primary_term: self.if_primary_term,
            pipeline: self.pipeline.as_deref(),
            ..Default::default()
        };
        let doc = match &self.doc {
            Some(doc) => doc.to_json_string()?,
            None => "null".to_string(),
        };
        Ok(vec![action_line(action, &meta)?, doc])
    }
}

/// Partial update, upsert or scripted update of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpdateRequest {
    index: Option<String>,
    doc_type: Option<String>,
    id: Option<String>,
    routing: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    if_seq_no: Option<i64>,
    if_primary_term: Option<i64>,
    retry_on_conflict: Option<u32>,
    doc: Option<Document>,
    upsert: Option<Document>,
    doc_as_upsert: Option<bool>,
    scripted_upsert: Option<bool>,
    detect_noop: Option<bool>,
    script: Option<Value>,
    return_source: Option<bool>,
}

impl BulkUpdateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    pub fn if_seq_no(mut self, seq_no: i64) -> Self {
        self.if_seq_no = Some(seq_no);
        self
    }

    pub fn if_primary_term(mut self, primary_term: i64) -> Self {
        self.if_primary_term = Some(primary_term);
        self
    }

    pub fn retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = Some(retries);
        self
    }

    /// Partial document merged into the stored one.
    pub fn doc(mut self, doc: impl Into<Document>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Document indexed when the target does not exist.
    pub fn upsert(mut self, upsert: impl Into<Document>) -> Self {
        self.upsert = Some(upsert.into());
        self
    }

    pub fn doc_as_upsert(mut self, enabled: bool) -> Self {
        self.doc_as_upsert = Some(enabled);
        self
    }

    pub fn scripted_upsert(mut self, enabled: bool) -> Self {
        self.scripted_upsert = Some(enabled);
        self
    }

    pub fn detect_noop(mut self, enabled: bool) -> Self {
        self.detect_noop = Some(enabled);
        self
    }

    /// Script object, e.g. `{"source": "ctx._source.n += 1", "lang": "painless"}`.
    pub fn script(mut self, script: Value) -> Self {
        self.script = Some(script);
        self
    }

    /// Ask the engine to return the updated `_source`.
    pub fn return_source(mut self, enabled: bool) -> Self {
        self.return_source = Some(enabled);
        self
    }

    fn body(&self) -> Result<Value> {
        let mut body = serde_json::Map::new();
        if let Some(doc) = &self.doc {
            body.insert("doc".to_string(), doc.to_value()?);
        }
        if let Some(upsert) = &self.upsert {
            body.insert("upsert".to_string(), upsert.to_value()?);
        }
        if let Some(enabled) = self.doc_as_upsert {
            body.insert("doc_as_upsert".to_string(), Value::Bool(enabled));
        }
        if let Some(enabled) = self.scripted_upsert {
            body.insert("scripted_upsert".to_string(), Value::Bool(enabled));
        }
        if let Some(enabled) = self.detect_noop {
            body.insert("detect_noop".to_string(), Value::Bool(enabled));
        }
        if let Some(script) = &self.script {
            body.insert("script".to_string(), script.clone());
        }
        if let Some(enabled) = self.return_source {
            body.insert("_source".to_string(), Value::Bool(enabled));
        }
        Ok(Value::Object(body))
    }

    /// Action line followed by the update body line.
    pub fn source(&self) -> Result<Vec<String>> {
        let meta = ActionMeta {
            index: self.index.as_deref(),
            doc_type: self.doc_type.as_deref(),
            id: self.id.as_deref(),
            routing: self.routing.as_deref(),
            version: self.version,
            version_type: self.version_type.as_deref(),
            if_seq_no: self.if_seq_no,
            if_primary_term: self.if_primary_term,
            retry_on_conflict: self.retry_on_conflict,
            ..Default::default()
        };
        Ok(vec![
            action_line("update", &meta)?,
            serde_json::to_string(&self.body()?)?,
        ])
    }
}

/// Delete action. Renders to a single line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDeleteRequest {
    index: Option<String>,
    doc_type: Option<String>,
    id: Option<String>,
    routing: Option<String>,
    version: Option<i64>,
    version_type: Option<String>,
    if_seq_no: Option<i64>,
    if_primary_term: Option<i64>,
}

impl BulkDeleteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn version_type(mut self, version_type: impl Into<String>) -> Self {
        self.version_type = Some(version_type.into());
        self
    }

    pub fn if_seq_no(mut self, seq_no: i64) -> Self {
        self.if_seq_no = Some(seq_no);
        self
    }

    pub fn if_primary_term(mut self, primary_term: i64) -> Self {
        self.if_primary_term = Some(primary_term);
        self
    }

    pub fn source(&self) -> Result<Vec<String>> {
        let meta = ActionMeta {
            index: self.index.as_deref(),
            doc_type: self.doc_type.as_deref(),
            id: self.id.as_deref(),
            routing: self.routing.as_deref(),
            version: self.version,
            version_type: self.version_type.as_deref(),
            if_seq_no: self.if_seq_no,
            if_primary_term: self.if_primary_term,
            ..Default::default()
        };
        Ok(vec![action_line("delete", &meta)?])
    }
}

/// Any request that can be queued on a bulk service.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkableRequest {
    Index(BulkIndexRequest),
    Update(BulkUpdateRequest),
    Delete(BulkDeleteRequest),
}

impl BulkableRequest {
    /// NDJSON lines of this action, without trailing newlines.
    pub fn source(&self) -> Result<Vec<String>> {
        match self {
            BulkableRequest::Index(r) => r.source(),
            BulkableRequest::Update(r) => r.source(),
            BulkableRequest::Delete(r) => r.source(),
        }
    }
}

impl fmt::Display for BulkableRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source() {
            Ok(lines) => write!(f, "{}", lines.join("\n")),
            Err(err) => write!(f, "error: {}", err),
        }
    }
}

impl From<BulkIndexRequest> for BulkableRequest {
    fn from(request: BulkIndexRequest) -> Self {
        BulkableRequest::Index(request)
    }
}

impl From<BulkUpdateRequest> for BulkableRequest {
    fn from(request: BulkUpdateRequest) -> Self {
        BulkableRequest::Update(request)
    }
}

impl From<BulkDeleteRequest> for BulkableRequest {
    fn from(request: BulkDeleteRequest) -> Self {
        BulkableRequest::Delete(request)
    }
}
