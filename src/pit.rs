//! Point-in-time snapshots (`_pit`).
//!
//! The id returned by the engine is opaque and is passed back unchanged.

use serde::Deserialize;
use serde_json::json;

use crate::client::Client;
use crate::error::{EsError, Result};
use crate::transport::{Method, Request};
use crate::utils::format_indices;

#[derive(Debug, Clone)]
pub struct OpenPointInTimeService {
    client: Client,
    indices: Vec<String>,
    keep_alive: Option<String>,
    routing: Option<String>,
    preference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPointInTimeResponse {
    pub id: String,
}

impl OpenPointInTimeService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            keep_alive: None,
            routing: None,
            preference: None,
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

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
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

    pub async fn execute(&self) -> Result<OpenPointInTimeResponse> {
        if self.indices.is_empty() {
            return Err(EsError::InvalidArgument(
                "opening a point in time requires an index".to_string(),
            ));
        }
        let keep_alive = self.keep_alive.as_deref().ok_or_else(|| {
            EsError::InvalidArgument("opening a point in time requires keep_alive".to_string())
        })?;
        let mut request = Request::new(
            Method::POST,
            format!("/{}/_pit", format_indices(&self.indices)),
        )
        .param("keep_alive", keep_alive);
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.as_str());
        }
        if let Some(preference) = &self.preference {
            request = request.param("preference", preference.as_str());
        }
        self.client.perform_request(request).await?.json()
    }
}

#[derive(Debug, Clone)]
pub struct ClosePointInTimeService {
    client: Client,
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePointInTimeResponse {
    pub succeeded: bool,
    pub num_freed: u64,
}

impl ClosePointInTimeService {
    pub fn new(client: Client, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }

    pub async fn execute(&self) -> Result<ClosePointInTimeResponse> {
        let body = json!({ "id": self.id });
        let request =
            Request::new(Method::DELETE, "/_pit").json_body(serde_json::to_string(&body)?);
        self.client.perform_request(request).await?.json()
    }
}
