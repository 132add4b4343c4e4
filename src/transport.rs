//! HTTP transport seam.
//!
//! [`Client`](crate::Client) talks to the cluster only through the
//! [`Transport`] trait, so tests and alternative HTTP stacks can be plugged in.
//! [`ReqwestTransport`] is the production implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client as HttpClient, ClientBuilder, RequestBuilder};
use tokio::fs::File;
use tokio::io::AsyncReadExt; // for read_to_end()
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::conf::Endpoint;
use crate::error::{EsError, Result};

pub use reqwest::Method;

/// Request body. The variant decides the content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `application/json`
    Json(String),
    /// `application/x-ndjson`, used by the bulk API.
    NdJson(String),
}

impl Body {
    pub fn as_str(&self) -> &str {
        match self {
            Body::Json(s) | Body::NdJson(s) => s,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Body::Json(_) => "application/json",
            Body::NdJson(_) => "application/x-ndjson",
        }
    }
}

/// One HTTP exchange with the cluster.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the endpoint URL, starting with `/`.
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Body>,
    /// Ceiling on the response body size in bytes.
    pub max_response_size: Option<u64>,
    /// Non-2xx statuses that are returned as a normal response.
    pub ignore_statuses: Vec<u16>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            max_response_size: None,
            ignore_statuses: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn json_body(mut self, body: String) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn ndjson_body(mut self, body: String) -> Self {
        self.body = Some(Body::NdJson(body));
        self
    }

    pub fn max_response_size(mut self, limit: Option<u64>) -> Self {
        self.max_response_size = limit;
        self
    }

    pub fn ignore_status(mut self, status: u16) -> Self {
        self.ignore_statuses.push(status);
        self
    }

    /// Value of a query parameter, last one wins.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw reply from the cluster.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Performs HTTP exchanges on behalf of a [`Client`](crate::Client).
///
/// Implementations return `Ok` for every HTTP reply regardless of status;
/// status mapping is the client's job. Errors are for failures to obtain a
/// reply at all.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn perform(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] backed by a reqwest client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    endpoint: Endpoint,
    http_client: HttpClient,
}

fn inject_auth(request_builder: RequestBuilder, endpoint: &Endpoint) -> RequestBuilder {
    if endpoint.is_basic_auth() {
        request_builder.basic_auth(endpoint.get_username(), endpoint.get_password())
    } else {
        request_builder
    }
}

/// Only failures to connect are retried: the request never reached the
/// server. A timed-out request may already have been applied.
fn is_retryable(err: &EsError) -> bool {
    match err {
        EsError::Http(err) => err.is_connect(),
        _ => false,
    }
}

impl ReqwestTransport {
    pub fn new(endpoint: Endpoint, http_client: HttpClient) -> Self {
        Self {
            endpoint,
            http_client,
        }
    }

    /// Builds the HTTP client from the endpoint's timeouts and certificates.
    pub async fn from_endpoint(endpoint: Endpoint) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .timeout(endpoint.get_timeout());
        for path in endpoint.get_root_certificates() {
            let mut buf = Vec::new();
            File::open(path).await?.read_to_end(&mut buf).await?;
            builder = builder.add_root_certificate(Certificate::from_pem(&buf)?);
        }
        if endpoint.is_insecure() {
            warn!(
                "Endpoint {} accepts invalid certificates",
                endpoint.get_name()
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self::new(endpoint, builder.build()?))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn call(&self, request: &Request) -> Result<Response> {
        let url = format!(
            "{}{}",
            self.endpoint.get_url().trim_end_matches('/'),
            request.path
        );
        let mut request_builder = self
            .http_client
            .request(request.method.clone(), url)
            .query(&request.params);
        if let Some(body) = &request.body {
            request_builder = request_builder
                .header(reqwest::header::CONTENT_TYPE, body.content_type())
                .body(body.as_str().to_owned());
        }
        request_builder = inject_auth(request_builder, &self.endpoint);

        let mut response = request_builder.send().await?;
        let status = response.status().as_u16();

        if let (Some(limit), Some(announced)) =
            (request.max_response_size, response.content_length())
        {
            if announced > limit {
                return Err(EsError::ResponseTooLarge {
                    limit,
                    size: announced,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if let Some(limit) = request.max_response_size {
                if body.len() as u64 > limit {
                    return Err(EsError::ResponseTooLarge {
                        limit,
                        size: body.len() as u64,
                    });
                }
            }
        }

        Ok(Response { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: Request) -> Result<Response> {
        let strategy = ExponentialBackoff::from_millis(50)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.endpoint.get_max_retries());

        let request = &request;
        RetryIf::start(
            strategy,
            move || async move {
                debug!("{} {}{}", request.method, self.endpoint.get_url(), request.path);
                self.call(request).await
            },
            |err: &EsError| {
                let retry = is_retryable(err);
                if retry {
                    warn!("Retrying {} {}: {}", request.method, request.path, err);
                }
                retry
            },
        )
        .await
    }
}
