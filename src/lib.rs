//! Typed client for the Elasticsearch/OpenSearch REST API.
//!
//! The crate covers the stateful parts of talking to a search cluster:
//!
//! - [`BulkService`]: batches index/update/delete actions into one NDJSON
//!   `_bulk` call and reports per-item outcomes.
//! - [`ScrollService`] and [`ScanService`]/[`ScanCursor`]: page through a
//!   server-side search context until the end of stream.
//! - [`Reindexer`]: scans one index and bulk-writes its documents into
//!   another, on the same or another cluster.
//!
//! Every request goes through a [`Transport`]; [`ReqwestTransport`] is the
//! HTTP implementation.
//!
//! ```rust,no_run
//! use es_fluent::{BulkIndexRequest, Client, Endpoint, Page};
//! use serde_json::json;
//!
//! # async fn run() -> es_fluent::Result<()> {
//! let client = Client::from_endpoint(Endpoint::new("local", "http://localhost:9200")).await?;
//!
//! let mut bulk = client.bulk();
//! bulk.add(BulkIndexRequest::new().index("tweets").id("1").doc(json!({"user": "olivere"})));
//! let response = bulk.execute().await?;
//! assert!(response.failed().is_empty());
//!
//! let mut scroll = client.scroll(["tweets"]).size(100);
//! while let Page::Hits(page) = scroll.next().await? {
//!     for hit in &page.hits.hits {
//!         println!("{}", hit.id);
//!     }
//! }
//! scroll.clear().await?;
//! # Ok(())
//! # }
//! ```

pub mod audit_builder;
pub mod bulk;
pub mod bulk_request;
pub mod clear_scroll;
pub mod client;
pub mod conf;
pub mod count;
pub mod error;
pub mod geo_point;
pub mod models;
pub mod pit;
pub mod reindexer;
pub mod scan;
pub mod scroll;
pub mod search_source;
pub mod transport;
mod utils;

pub use audit_builder::{AuditBuilder, What};
pub use bulk::BulkService;
pub use bulk_request::{
    BulkDeleteRequest, BulkIndexRequest, BulkUpdateRequest, BulkableRequest, Document,
};
pub use clear_scroll::{ClearScrollResponse, ClearScrollService};
pub use client::Client;
pub use conf::{BasicAuth, Config, Endpoint, ReindexJob};
pub use count::CountService;
pub use error::{is_conflict, is_not_found, is_timeout, ApiError, ErrorDetails, EsError, Result};
pub use geo_point::GeoPoint;
pub use models::aggregations::Aggregations;
pub use models::bulk::{BulkResponse, BulkResponseEntry, BulkResponseItem};
pub use models::search_result::{SearchHit, SearchHits, SearchResult, TotalHits};
pub use models::server_info::ServerInfo;
pub use pit::{ClosePointInTimeService, OpenPointInTimeService};
pub use reindexer::{
    copy_to_target_index, ReindexError, Reindexer, ReindexerResponse, DEFAULT_BULK_SIZE,
};
pub use scan::{ScanCursor, ScanService};
pub use scroll::{EndOfStream, Page, ScrollService, DEFAULT_KEEP_ALIVE};
pub use search_source::SearchSource;
pub use transport::{Body, Method, ReqwestTransport, Request, Response, Transport};
