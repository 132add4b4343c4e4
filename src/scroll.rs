//! Scroll cursor over a server-side search context.
//!
//! [`ScrollService`] returns every page as [`Page::Hits`] and ends with
//! [`Page::Exhausted`] carrying [`EndOfStream::Eof`]. The scan cursor in
//! [`crate::scan`] ends with [`EndOfStream::Eos`] instead; the two markers
//! let callers tell which pagination path produced the end of stream.

use serde_json::{json, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::{EsError, Result};
use crate::models::search_result::SearchResult;
use crate::search_source::SearchSource;
use crate::transport::{Method, Request};
use crate::utils::{format_indices, indices_path};

/// Keep-alive used when none is configured.
pub const DEFAULT_KEEP_ALIVE: &str = "5m";

/// How a cursor reported that no more hits are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStream {
    /// End of a [`ScanCursor`](crate::ScanCursor).
    Eos,
    /// End of a [`ScrollService`].
    Eof,
}

/// Outcome of advancing a cursor.
#[derive(Debug, Clone)]
pub enum Page {
    Hits(SearchResult),
    Exhausted(EndOfStream),
}

impl Page {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Page::Exhausted(_))
    }

    /// The page, or `None` at end of stream.
    pub fn into_result(self) -> Option<SearchResult> {
        match self {
            Page::Hits(result) => Some(result),
            Page::Exhausted(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No request sent yet.
    Opened,
    Paging,
    Exhausted,
    Cleared,
}

/// `POST /_search/scroll` continuing `scroll_id`.
pub(crate) fn continue_request(
    keep_alive: &str,
    scroll_id: &str,
    max_response_size: Option<u64>,
) -> Result<Request> {
    let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });
    Ok(Request::new(Method::POST, "/_search/scroll")
        .json_body(serde_json::to_string(&body)?)
        .max_response_size(max_response_size))
}

/// Path of the opening search, with legacy types when given.
pub(crate) fn search_path(indices: &[String], doc_types: &[String]) -> String {
    if doc_types.is_empty() {
        indices_path(indices, "_search")
    } else {
        format!(
            "/{}/{}/_search",
            format_indices(indices),
            doc_types.join(",")
        )
    }
}

/// Pages through the hits of a query.
///
/// The first call to [`next`](Self::next) opens the context and always
/// returns the first page, even when it is empty; the following call
/// reports [`EndOfStream::Eof`]. Each reply carries the scroll id to use for
/// the next request, and only the latest one is kept.
///
/// Not safe for concurrent use; the context is released only by
/// [`clear`](Self::clear) or server-side expiry.
#[derive(Debug, Clone)]
pub struct ScrollService {
    client: Client,
    indices: Vec<String>,
    doc_types: Vec<String>,
    source: SearchSource,
    keep_alive: String,
    routing: Option<String>,
    preference: Option<String>,
    max_response_size: Option<u64>,
    scroll_id: Option<String>,
    state: State,
}

impl ScrollService {
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
            scroll_id: None,
            state: State::Opened,
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

    /// Mapping types, for clusters that still have them.
    pub fn doc_types<I, S>(mut self, doc_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc_types.extend(doc_types.into_iter().map(Into::into));
        self
    }

    /// How long the server keeps the context between requests, e.g. `1m`.
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    /// Hits per page.
    pub fn size(mut self, size: usize) -> Self {
        self.source = self.source.size(size);
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.source = self.source.query(query);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.source = self.source.sort(field, ascending);
        self
    }

    /// Replaces the whole request body.
    pub fn search_source(mut self, source: SearchSource) -> Self {
        self.source = source;
        self
    }

    pub fn fetch_source(mut self, enabled: bool) -> Self {
        self.source = self.source.fetch_source(enabled);
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

    /// Fails a page with [`EsError::ResponseTooLarge`] above `limit` bytes.
    pub fn max_response_size(mut self, limit: u64) -> Self {
        self.max_response_size = Some(limit);
        self
    }

    /// Resumes an existing context instead of opening a new one.
    pub fn with_scroll_id(mut self, scroll_id: impl Into<String>) -> Self {
        self.scroll_id = Some(scroll_id.into());
        self.state = State::Paging;
        self
    }

    /// The most recent scroll id returned by the server.
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    fn open_request(&self) -> Result<Request> {
        let mut request = Request::new(
            Method::POST,
            search_path(&self.indices, &self.doc_types),
        )
        .param("scroll", self.keep_alive.as_str())
        .json_body(self.source.to_json()?)
        .max_response_size(self.max_response_size);
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.as_str());
        }
        if let Some(preference) = &self.preference {
            request = request.param("preference", preference.as_str());
        }
        Ok(request)
    }

    async fn fetch(&self, request: Request) -> Result<SearchResult> {
        self.client.perform_request(request).await?.json()
    }

    fn remember(&mut self, result: &SearchResult) {
        if let Some(id) = result.scroll_id() {
            self.scroll_id = Some(id.to_string());
        }
    }

    /// Advances the cursor by one page.
    pub async fn next(&mut self) -> Result<Page> {
        match self.state {
            State::Cleared => Err(EsError::ScrollCleared),
            State::Exhausted => Ok(Page::Exhausted(EndOfStream::Eof)),
            State::Opened => {
                let result = self.fetch(self.open_request()?).await?;
                self.remember(&result);
                debug!(
                    "Opened scroll over {:?}: {} total hits, first page of {}",
                    self.indices,
                    result.total_hits(),
                    result.len()
                );
                self.state = if result.is_empty() || self.scroll_id.is_none() {
                    State::Exhausted
                } else {
                    State::Paging
                };
                Ok(Page::Hits(result))
            }
            State::Paging => {
                let Some(scroll_id) = self.scroll_id.as_deref() else {
                    self.state = State::Exhausted;
                    return Ok(Page::Exhausted(EndOfStream::Eof));
                };
                let request =
                    continue_request(&self.keep_alive, scroll_id, self.max_response_size)?;
                let result = self.fetch(request).await?;
                self.remember(&result);
                if result.is_empty() {
                    self.state = State::Exhausted;
                    return Ok(Page::Exhausted(EndOfStream::Eof));
                }
                Ok(Page::Hits(result))
            }
        }
    }

    /// Releases the server-side context. Every later call fails with
    /// [`EsError::ScrollCleared`].
    ///
    /// If the request fails the cursor keeps its scroll id and `clear` can be
    /// called again.
    pub async fn clear(&mut self) -> Result<()> {
        if self.state == State::Cleared {
            return Err(EsError::ScrollCleared);
        }
        if let Some(scroll_id) = &self.scroll_id {
            self.client
                .clear_scroll([scroll_id.as_str()])
                .execute()
                .await?;
        }
        self.scroll_id = None;
        self.state = State::Cleared;
        Ok(())
    }
}
