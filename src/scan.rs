//! Scan cursor: scroll in index order, for bulk export.
//!
//! On clusters older than 5.0 the opening search uses `search_type=scan`,
//! which returns no hits and only the total; newer clusters dropped scan and
//! get the same effect from sorting by `_doc`, in which case the opening
//! reply already carries the first hits.

use serde_json::{json, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::{EsError, Result};
use crate::models::search_result::SearchResult;
use crate::scroll::{continue_request, search_path, EndOfStream, Page, DEFAULT_KEEP_ALIVE};
use crate::search_source::SearchSource;
use crate::transport::{Method, Request};

/// First server major version without `search_type=scan`.
const SCAN_REMOVED_IN_MAJOR: u64 = 5;

/// Configures and opens a [`ScanCursor`].
#[derive(Debug, Clone)]
pub struct ScanService {
    client: Client,
    indices: Vec<String>,
    doc_types: Vec<String>,
    source: SearchSource,
    keep_alive: String,
    routing: Option<String>,
    preference: Option<String>,
    max_response_size: Option<u64>,
}

impl ScanService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            doc_types: Vec::new(),
            source: SearchSource::new(),
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
            routing: None,
            preference: None,
            max_response_size: None,
        }
    }

    pub fn indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices.extend(indices.into_iter().map(Into::into));
        self
    }

    pub fn doc_types<I, S>(mut self, doc_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc_types.extend(doc_types.into_iter().map(Into::into));
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    /// Hits per page; per shard when `search_type=scan` is in use.
    pub fn size(mut self, size: usize) -> Self {
        self.source = self.source.size(size);
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.source = self.source.query(query);
        self
    }

    /// Sort order; without one, hits come in index order.
    pub fn sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.source = self.source.sort(field, ascending);
        self
    }

    pub fn search_source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn max_response_size(mut self, limit: u64) -> Self {
        self.max_response_size = Some(limit);
        self
    }

    fn uses_search_type_scan(&self) -> bool {
        matches!(self.client.server_major_version(), Some(major) if major < SCAN_REMOVED_IN_MAJOR)
            && !self.source.has_sort()
    }

    fn open_request(&self) -> Result<Request> {
        let scan = self.uses_search_type_scan();
        let mut source = self.source.clone();
        if !scan && !source.has_sort() {
            source = source.sort_raw(json!("_doc"));
        }

        let mut request = Request::new(
            Method::POST,
            search_path(&self.indices, &self.doc_types),
        )
        .param("scroll", self.keep_alive.as_str())
        .json_body(source.to_json()?)
        .max_response_size(self.max_response_size);
        if scan {
            request = request.param("search_type", "scan");
        }
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.as_str());
        }
        if let Some(preference) = &self.preference {
            request = request.param("preference", preference.as_str());
        }
        Ok(request)
    }

    /// Runs the opening search and returns a cursor positioned before the
    /// first page.
    pub async fn execute(&self) -> Result<ScanCursor> {
        let result: SearchResult = self
            .client
            .perform_request(self.open_request()?)
            .await?
            .json()?;
        debug!(
            "Opened scan over {:?}: {} total hits",
            self.indices,
            result.total_hits()
        );
        Ok(ScanCursor::new(
            self.client.clone(),
            self.keep_alive.clone(),
            self.max_response_size,
            result,
        ))
    }
}

/// Iterates the pages of an opened scan.
///
/// When the scan matched nothing, the first [`next`](Self::next) returns an
/// empty page and the second returns [`EndOfStream::Eos`]. Otherwise pages
/// are returned until one comes back empty, which is reported as
/// [`EndOfStream::Eos`] rather than as a page.
#[derive(Debug)]
pub struct ScanCursor {
    client: Client,
    keep_alive: String,
    max_response_size: Option<u64>,
    total_hits: u64,
    scroll_id: Option<String>,
    /// Reply of the opening search, not yet handed out.
    pending: Option<SearchResult>,
    current_page: u64,
    last_page_empty: bool,
    exhausted: bool,
    cleared: bool,
}

impl ScanCursor {
    fn new(
        client: Client,
        keep_alive: String,
        max_response_size: Option<u64>,
        opening: SearchResult,
    ) -> Self {
        Self {
            client,
            keep_alive,
            max_response_size,
            total_hits: opening.total_hits(),
            scroll_id: opening.scroll_id().map(str::to_string),
            pending: Some(opening),
            current_page: 0,
            last_page_empty: false,
            exhausted: false,
            cleared: false,
        }
    }

    /// Total hits reported by the opening search.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Pages handed out so far.
    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    fn end(&mut self) -> Page {
        self.exhausted = true;
        Page::Exhausted(EndOfStream::Eos)
    }

    /// Advances the cursor by one page.
    pub async fn next(&mut self) -> Result<Page> {
        if self.cleared {
            return Err(EsError::ScrollCleared);
        }
        if self.exhausted || (self.current_page > 0 && self.last_page_empty) {
            return Ok(self.end());
        }

        if let Some(opening) = self.pending.take() {
            // Scan-type replies carry no hits: page through the scroll instead.
            if !opening.is_empty() || self.total_hits == 0 {
                self.current_page += 1;
                self.last_page_empty = opening.is_empty();
                return Ok(Page::Hits(opening));
            }
        }

        let Some(scroll_id) = self.scroll_id.as_deref() else {
            return Ok(self.end());
        };
        let request = continue_request(&self.keep_alive, scroll_id, self.max_response_size)?;
        let result: SearchResult = self.client.perform_request(request).await?.json()?;
        if let Some(id) = result.scroll_id() {
            self.scroll_id = Some(id.to_string());
        }
        self.current_page += 1;

        if result.is_empty() {
            return Ok(self.end());
        }
        self.last_page_empty = false;
        Ok(Page::Hits(result))
    }

    /// Releases the server-side context. Every later call fails with
    /// [`EsError::ScrollCleared`].
    pub async fn clear(&mut self) -> Result<()> {
        if self.cleared {
            return Err(EsError::ScrollCleared);
        }
        if let Some(scroll_id) = &self.scroll_id {
            self.client
                .clear_scroll([scroll_id.as_str()])
                .execute()
                .await?;
        }
        self.scroll_id = None;
        self.pending = None;
        self.cleared = true;
        Ok(())
    }
}
