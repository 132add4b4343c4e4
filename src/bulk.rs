//! Batching of write operations into one `_bulk` call.

use tracing::{debug, warn};

use crate::bulk_request::BulkableRequest;
use crate::client::Client;
use crate::error::{EsError, Result};
use crate::models::bulk::BulkResponse;
use crate::transport::{Method, Request};

/// Ordered queue of write operations submitted as one NDJSON payload.
///
/// The queue has no size limit; callers flush when
/// [`number_of_actions`](Self::number_of_actions) reaches their batch size.
/// A successful [`execute`](Self::execute) empties the queue, a failed one
/// keeps it so the same batch can be submitted again.
#[derive(Debug, Clone)]
pub struct BulkService {
    client: Client,
    index: Option<String>,
    doc_type: Option<String>,
    requests: Vec<BulkableRequest>,
    refresh: Option<String>,
    timeout: Option<String>,
    pipeline: Option<String>,
    routing: Option<String>,
    wait_for_active_shards: Option<String>,
    max_response_size: Option<u64>,
}

impl BulkService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            index: None,
            doc_type: None,
            requests: Vec::new(),
            refresh: None,
            timeout: None,
            pipeline: None,
            routing: None,
            wait_for_active_shards: None,
            max_response_size: None,
        }
    }

    /// Default index for actions that do not name one.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Default type for actions that do not name one.
    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    /// `true`, `false` or `wait_for`.
    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn wait_for_active_shards(mut self, count: impl Into<String>) -> Self {
        self.wait_for_active_shards = Some(count.into());
        self
    }

    pub fn max_response_size(mut self, limit: u64) -> Self {
        self.max_response_size = Some(limit);
        self
    }

    /// Queues one action.
    pub fn add(&mut self, request: impl Into<BulkableRequest>) -> &mut Self {
        self.requests.push(request.into());
        self
    }

    /// Queues one action, builder style.
    pub fn with(mut self, request: impl Into<BulkableRequest>) -> Self {
        self.add(request);
        self
    }

    pub fn number_of_actions(&self) -> usize {
        self.requests.len()
    }

    pub fn requests(&self) -> &[BulkableRequest] {
        &self.requests
    }

    /// Drops every queued action.
    pub fn reset(&mut self) {
        self.requests.clear();
    }

    /// Size of the payload the queued actions would produce.
    pub fn estimated_size_in_bytes(&self) -> Result<u64> {
        let mut size = 0u64;
        for request in &self.requests {
            for line in request.source()? {
                size += line.len() as u64 + 1;
            }
        }
        Ok(size)
    }

    /// The NDJSON payload: every line newline-terminated, in queue order.
    pub fn body_as_string(&self) -> Result<String> {
        let mut body = String::new();
        for request in &self.requests {
            for line in request.source()? {
                body.push_str(&line);
                body.push('\n');
            }
        }
        Ok(body)
    }

    fn build_request(&self, body: String) -> Request {
        let path = match (&self.index, &self.doc_type) {
            (Some(index), Some(doc_type)) => format!("/{}/{}/_bulk", index, doc_type),
            (Some(index), None) => format!("/{}/_bulk", index),
            (None, Some(doc_type)) => format!("/_all/{}/_bulk", doc_type),
            (None, None) => "/_bulk".to_string(),
        };
        let mut request = Request::new(Method::POST, path)
            .ndjson_body(body)
            .max_response_size(self.max_response_size);
        if let Some(refresh) = &self.refresh {
            request = request.param("refresh", refresh.as_str());
        }
        if let Some(timeout) = &self.timeout {
            request = request.param("timeout", timeout.as_str());
        }
        if let Some(pipeline) = &self.pipeline {
            request = request.param("pipeline", pipeline.as_str());
        }
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.as_str());
        }
        if let Some(count) = &self.wait_for_active_shards {
            request = request.param("wait_for_active_shards", count.as_str());
        }
        request
    }

    /// Submits the queued actions.
    ///
    /// Transport and decode failures fail the whole call and leave the queue
    /// intact. Per-item failures are reported in the returned response.
    pub async fn execute(&mut self) -> Result<BulkResponse> {
        if self.requests.is_empty() {
            return Err(EsError::NoBulkActions);
        }
        let body = self.body_as_string()?;
        let submitted = self.requests.len();

        let response = self
            .client
            .perform_request(self.build_request(body))
            .await?;
        let bulk: BulkResponse = response.json()?;

        if bulk.items.len() != submitted {
            return Err(EsError::UnexpectedResponse(format!(
                "bulk reply has {} items for {} submitted actions",
                bulk.items.len(),
                submitted
            )));
        }

        let failed = bulk.failed();
        debug!(
            "Bulk of {} actions took {}ms, {} failed",
            submitted,
            bulk.took,
            failed.len()
        );
        for item in failed.iter().take(5) {
            warn!(
                "Bulk item {}/{} failed with status {}: {:?}",
                item.index,
                item.id,
                item.status,
                item.error.as_ref().and_then(|e| e.reason.as_deref())
            );
        }

        self.reset();
        Ok(bulk)
    }
}
