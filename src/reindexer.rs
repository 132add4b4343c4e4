//! Copies documents from one index into another, optionally across clusters.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit_builder::{AuditBuilder, AuditRecord, What};
use crate::bulk::BulkService;
use crate::bulk_request::BulkIndexRequest;
use crate::client::Client;
use crate::error::{EsError, Result};
use crate::models::bulk::BulkResponseItem;
use crate::models::search_result::SearchHit;
use crate::scan::ScanCursor;
use crate::scroll::{Page, DEFAULT_KEEP_ALIVE};

/// Actions queued before a bulk commit when none is configured.
pub const DEFAULT_BULK_SIZE: usize = 500;

/// Turns one source hit into zero or more queued bulk actions.
pub type ReindexerFunc = Box<dyn FnMut(&SearchHit, &mut BulkService) -> Result<()> + Send>;

/// Called after each document with `(current, total)`.
pub type ProgressFunc = Box<dyn FnMut(u64, u64) + Send>;

/// Counters of a reindex run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReindexerResponse {
    pub success: u64,
    pub failed: u64,
    /// Failed bulk items; empty when `stats_only` is set.
    pub errors: Vec<BulkResponseItem>,
    /// Number of bulk requests sent.
    pub commits: u64,
}

/// A reindex stopped by a transport or decode failure, with what had been
/// committed before it.
#[derive(Debug, Error)]
#[error("Reindex aborted after {} succeeded and {} failed: {source}", .partial.success, .partial.failed)]
pub struct ReindexError {
    pub partial: ReindexerResponse,
    #[source]
    pub source: EsError,
}

/// Default hit mapping: index the hit's `_source` under the same id (and
/// routing, and legacy type) into `target_index`.
pub fn copy_to_target_index(target_index: impl Into<String>) -> ReindexerFunc {
    let target_index = target_index.into();
    Box::new(move |hit: &SearchHit, bulk: &mut BulkService| {
        let source = hit.source.clone().ok_or_else(|| EsError::MissingSource {
            index: hit.index.clone(),
            id: hit.id.clone(),
        })?;
        let mut request = BulkIndexRequest::new()
            .index(target_index.as_str())
            .id(hit.id.as_str())
            .doc(source);
        if let Some(doc_type) = hit.doc_type.as_deref().filter(|t| *t != "_doc") {
            request = request.doc_type(doc_type);
        }
        if let Some(routing) = &hit.routing {
            request = request.routing(routing.as_str());
        }
        bulk.add(request);
        Ok(())
    })
}

/// Scans a source index and bulk-indexes every hit into a target index.
///
/// A bulk request is sent whenever `bulk_size` actions are queued and once
/// more after the scan is exhausted. Items the target rejects are counted
/// (and, without `stats_only`, collected) but do not stop the run.
pub struct Reindexer {
    source_client: Client,
    target_client: Option<Client>,
    source_index: String,
    target_index: String,
    query: Option<Value>,
    keep_alive: String,
    size: Option<usize>,
    bulk_size: usize,
    stats_only: bool,
    progress: Option<ProgressFunc>,
    reindexer_func: Option<ReindexerFunc>,
    audit: AuditBuilder,
}

impl fmt::Debug for Reindexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reindexer")
            .field("source_index", &self.source_index)
            .field("target_index", &self.target_index)
            .field("query", &self.query)
            .field("keep_alive", &self.keep_alive)
            .field("size", &self.size)
            .field("bulk_size", &self.bulk_size)
            .field("stats_only", &self.stats_only)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Reindexer {
    pub fn new(
        source_client: Client,
        source_index: impl Into<String>,
        target_index: impl Into<String>,
    ) -> Self {
        Self {
            source_client,
            target_client: None,
            source_index: source_index.into(),
            target_index: target_index.into(),
            query: None,
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            size: None,
            bulk_size: DEFAULT_BULK_SIZE,
            stats_only: true,
            progress: None,
            reindexer_func: None,
            audit: AuditBuilder::disabled(),
        }
    }

    /// Writes to another cluster instead of the source one.
    pub fn target_client(mut self, client: Client) -> Self {
        self.target_client = Some(client);
        self
    }

    /// Restricts the copy to documents matching `query`.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Scroll keep-alive, `5m` by default.
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    /// Hits fetched per scroll page.
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Actions per bulk request; 0 restores the default.
    pub fn bulk_size(mut self, bulk_size: usize) -> Self {
        self.bulk_size = if bulk_size == 0 {
            DEFAULT_BULK_SIZE
        } else {
            bulk_size
        };
        self
    }

    /// When false, failed bulk items are kept in the response.
    pub fn stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }

    /// Progress callback. Setting one costs an extra count request up front.
    pub fn progress(mut self, progress: impl FnMut(u64, u64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Replaces [`copy_to_target_index`] with a custom hit mapping.
    pub fn reindex_with(
        mut self,
        func: impl FnMut(&SearchHit, &mut BulkService) -> Result<()> + Send + 'static,
    ) -> Self {
        self.reindexer_func = Some(Box::new(func));
        self
    }

    pub fn audit(mut self, audit: AuditBuilder) -> Self {
        self.audit = audit;
        self
    }

    async fn audit_event(
        &mut self,
        what: What,
        actions: u64,
        succeeded: u64,
        failed: u64,
        message: Option<String>,
    ) {
        if !self.audit.is_enabled() {
            return;
        }
        let record = AuditRecord {
            timestamp: String::new(),
            what,
            source_index: &self.source_index,
            target_index: &self.target_index,
            actions,
            succeeded,
            failed,
            message,
        };
        self.audit.record(record).await;
    }

    /// Runs the copy.
    pub async fn execute(mut self) -> std::result::Result<ReindexerResponse, ReindexError> {
        info!(
            "Reindexing {} into {} (bulk size {})",
            self.source_index, self.target_index, self.bulk_size
        );
        self.audit_event(What::ReindexStarted, 0, 0, 0, None).await;

        let mut response = ReindexerResponse::default();
        let outcome = self.run(&mut response).await;

        match outcome {
            Ok(()) => {
                info!(
                    "Reindexed {} into {}: {} succeeded, {} failed in {} bulk requests",
                    self.source_index,
                    self.target_index,
                    response.success,
                    response.failed,
                    response.commits
                );
                self.audit_event(
                    What::ReindexFinished,
                    response.success + response.failed,
                    response.success,
                    response.failed,
                    None,
                )
                .await;
                Ok(response)
            }
            Err(source) => {
                warn!(
                    "Reindex of {} into {} aborted: {}",
                    self.source_index, self.target_index, source
                );
                self.audit_event(
                    What::ReindexFinished,
                    response.success + response.failed,
                    response.success,
                    response.failed,
                    Some(source.to_string()),
                )
                .await;
                Err(ReindexError {
                    partial: response,
                    source,
                })
            }
        }
    }

    async fn run(&mut self, response: &mut ReindexerResponse) -> Result<()> {
        let total = if self.progress.is_some() {
            self.count().await?
        } else {
            0
        };

        let mut scanner = self
            .source_client
            .scan([self.source_index.as_str()])
            .keep_alive(self.keep_alive.as_str());
        if let Some(query) = &self.query {
            scanner = scanner.query(query.clone());
        }
        if let Some(size) = self.size {
            scanner = scanner.size(size);
        }
        let mut cursor = scanner.execute().await?;

        let outcome = self.drain(&mut cursor, total, response).await;
        if let Err(err) = cursor.clear().await {
            warn!("Failed to clear scroll of {}: {}", self.source_index, err);
        }
        outcome
    }

    async fn drain(
        &mut self,
        cursor: &mut ScanCursor,
        total: u64,
        response: &mut ReindexerResponse,
    ) -> Result<()> {
        let target_client = self
            .target_client
            .clone()
            .unwrap_or_else(|| self.source_client.clone());
        let mut reindexer_func = self
            .reindexer_func
            .take()
            .unwrap_or_else(|| copy_to_target_index(self.target_index.as_str()));
        let mut bulk = target_client.bulk();
        let mut current = 0u64;

        loop {
            let page = match cursor.next().await? {
                Page::Hits(page) => page,
                Page::Exhausted(_) => break,
            };
            for hit in &page.hits.hits {
                reindexer_func(hit, &mut bulk)?;
                if let Some(progress) = self.progress.as_mut() {
                    current += 1;
                    progress(current, total);
                }
                if bulk.number_of_actions() >= self.bulk_size {
                    self.commit(&mut bulk, response).await?;
                }
            }
        }

        if bulk.number_of_actions() > 0 {
            self.commit(&mut bulk, response).await?;
        }
        Ok(())
    }

    async fn count(&mut self) -> Result<u64> {
        let mut count = self.source_client.count([self.source_index.as_str()]);
        if let Some(query) = &self.query {
            count = count.query(query.clone());
        }
        count.execute().await
    }

    async fn commit(
        &mut self,
        bulk: &mut BulkService,
        response: &mut ReindexerResponse,
    ) -> Result<()> {
        let actions = bulk.number_of_actions() as u64;
        self.audit_event(What::BulkRequest, actions, 0, 0, None).await;

        let bulk_response = match bulk.execute().await {
            Ok(bulk_response) => bulk_response,
            Err(err) => {
                self.audit_event(What::BulkResponseErr, actions, 0, 0, Some(err.to_string()))
                    .await;
                return Err(err);
            }
        };

        let failed = bulk_response.failed();
        let succeeded = bulk_response.succeeded().len() as u64;
        response.success += succeeded;
        response.failed += failed.len() as u64;
        response.commits += 1;
        if !self.stats_only {
            response.errors.extend(failed.iter().map(|item| (*item).clone()));
        }
        debug!(
            "Committed {} actions into {}: {} succeeded, {} failed",
            actions,
            self.target_index,
            succeeded,
            failed.len()
        );

        let what = if failed.is_empty() {
            What::BulkResponseOk
        } else {
            What::BulkResponseErr
        };
        let failed_count = failed.len() as u64;
        self.audit_event(what, actions, succeeded, failed_count, None)
            .await;
        Ok(())
    }
}
