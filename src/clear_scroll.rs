use serde::Deserialize;
use serde_json::json;

use crate::client::Client;
use crate::error::{EsError, Result};
use crate::transport::{Method, Request};

/// Releases scroll contexts with `DELETE /_search/scroll`.
///
/// A context that already expired is reported with `succeeded: false`
/// rather than as an error.
#[derive(Debug, Clone)]
pub struct ClearScrollService {
    client: Client,
    scroll_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearScrollResponse {
    #[serde(default)]
    pub succeeded: bool,
    #[serde(default)]
    pub num_freed: u64,
}

impl ClearScrollService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scroll_ids: Vec::new(),
        }
    }

    pub fn scroll_ids<I, S>(mut self, scroll_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scroll_ids.extend(scroll_ids.into_iter().map(Into::into));
        self
    }

    pub async fn execute(&self) -> Result<ClearScrollResponse> {
        if self.scroll_ids.is_empty() {
            return Err(EsError::InvalidArgument(
                "at least one scroll id is required".to_string(),
            ));
        }
        let body = json!({ "scroll_id": self.scroll_ids });
        let request = Request::new(Method::DELETE, "/_search/scroll")
            .json_body(serde_json::to_string(&body)?)
            .ignore_status(404);
        let response = self.client.perform_request(request).await?;
        if response.status == 404 {
            return Ok(ClearScrollResponse::default());
        }
        response.json()
    }
}
