//! Error types shared by every service in the crate.

use human_bytes::human_bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by client operations.
///
/// End of a scroll is not an error; see [`crate::Page`]. Per-item bulk
/// failures are not errors either; see [`crate::BulkResponse::failed`].
#[derive(Error, Debug)]
pub enum EsError {
    /// Failure reported by the reqwest transport (connect, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by any other transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body was not valid JSON for the expected type.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response body was valid JSON but did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The search engine answered with a non-2xx status.
    #[error("{0}")]
    Api(ApiError),

    /// The response body exceeded the configured ceiling.
    #[error("Response of {} exceeds the limit of {}", human_bytes(*.size as f64), human_bytes(*.limit as f64))]
    ResponseTooLarge {
        /// Configured ceiling in bytes.
        limit: u64,
        /// Observed (or announced) size in bytes.
        size: u64,
    },

    /// The scroll context was released by `clear()`.
    #[error("Scroll context has been cleared")]
    ScrollCleared,

    /// `BulkService::execute` was called with an empty queue.
    #[error("No bulk actions to commit")]
    NoBulkActions,

    /// A search hit did not carry `_source`.
    #[error("Hit {index}/{id} has no _source")]
    MissingSource {
        /// Index of the hit.
        index: String,
        /// Id of the hit.
        id: String,
    },

    /// Input could not be parsed as `lat,lon`.
    #[error("{0:?} is not a valid geo point string")]
    InvalidGeoPoint(String),

    /// A service was configured with an unusable value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, EsError>;

impl EsError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            EsError::Api(api) => Some(api.status),
            _ => None,
        }
    }

    /// True for a 404 reply.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for a 409 reply, e.g. a version conflict.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// True for a 408 reply or a transport-level timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            EsError::Api(api) => api.status == 408,
            EsError::Http(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Returns true if `err` signals a missing index, document or scroll context.
pub fn is_not_found(err: &EsError) -> bool {
    err.is_not_found()
}

/// Returns true if `err` signals a conflict.
pub fn is_conflict(err: &EsError) -> bool {
    err.is_conflict()
}

/// Returns true if `err` signals a timeout.
pub fn is_timeout(err: &EsError) -> bool {
    err.is_timeout()
}

/// Non-2xx reply from the search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Structured error body, when the engine sent one.
    pub details: Option<ErrorDetails>,
}

impl ApiError {
    /// Builds an error from a status and the raw response body.
    ///
    /// Both the structured (`{"error": {"type": ..}}`) and the legacy
    /// string (`{"error": "IndexMissingException[..]"}`) bodies are accepted.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let details = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| match body.error {
                Some(ErrorField::Details(details)) => Some(details),
                Some(ErrorField::Message(reason)) => Some(ErrorDetails {
                    reason: Some(reason),
                    ..Default::default()
                }),
                None => None,
            });
        Self { status, details }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(
                f,
                "Error {} ({}): {}",
                self.status,
                details.error_type.as_deref().unwrap_or("unknown"),
                details.reason.as_deref().unwrap_or("")
            ),
            None => write!(f, "Error {}", self.status),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Details(ErrorDetails),
    Message(String),
}

/// Structured error reported by the engine, either for a whole request or
/// for a single bulk item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error type, e.g. `version_conflict_engine_exception`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Human readable reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Index the error relates to.
    #[serde(default)]
    pub index: Option<String>,
    /// Shard the error relates to.
    #[serde(default)]
    pub shard: Option<serde_json::Value>,
    /// Root causes, innermost first.
    #[serde(default)]
    pub root_cause: Vec<ErrorDetails>,
    /// Nested cause.
    #[serde(default)]
    pub caused_by: Option<Box<ErrorDetails>>,
}
