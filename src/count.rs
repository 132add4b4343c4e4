use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::Client;
use crate::error::Result;
use crate::transport::{Method, Request};
use crate::utils::indices_path;

/// Number of documents matching an optional query.
#[derive(Debug, Clone)]
pub struct CountService {
    client: Client,
    indices: Vec<String>,
    query: Option<Value>,
    routing: Option<String>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl CountService {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            indices: Vec::new(),
            query: None,
            routing: None,
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

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub async fn execute(&self) -> Result<u64> {
        let mut request = Request::new(Method::POST, indices_path(&self.indices, "_count"));
        if let Some(query) = &self.query {
            request = request.json_body(serde_json::to_string(&json!({ "query": query }))?);
        }
        if let Some(routing) = &self.routing {
            request = request.param("routing", routing.as_str());
        }
        let response: CountResponse = self.client.perform_request(request).await?.json()?;
        Ok(response.count)
    }
}
