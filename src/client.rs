use std::sync::Arc;

use semver::Version;
use tracing::{debug, info};

use crate::bulk::BulkService;
use crate::clear_scroll::ClearScrollService;
use crate::conf::Endpoint;
use crate::count::CountService;
use crate::error::{ApiError, EsError, Result};
use crate::models::server_info::ServerInfo;
use crate::pit::{ClosePointInTimeService, OpenPointInTimeService};
use crate::reindexer::Reindexer;
use crate::scan::ScanService;
use crate::scroll::ScrollService;
use crate::transport::{Method, ReqwestTransport, Request, Response, Transport};

/// Entry point to every service. Cloning is cheap and clones share the
/// transport.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    version: Option<Version>,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            version: None,
        }
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            version: None,
        }
    }

    /// Client using [`ReqwestTransport`] for `endpoint`.
    pub async fn from_endpoint(endpoint: Endpoint) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::from_endpoint(endpoint).await?))
    }

    /// Pins the server version used to pick version-dependent request shapes.
    pub fn with_server_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn server_version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Major version of the server, if known.
    pub fn server_major_version(&self) -> Option<u64> {
        self.version.as_ref().map(|v| v.major)
    }

    /// Sends `request` and maps non-2xx replies to [`EsError::Api`].
    pub async fn perform_request(&self, request: Request) -> Result<Response> {
        let limit = request.max_response_size;
        let ignore = request.ignore_statuses.clone();
        debug!("{} {}", request.method, request.path);

        let response = self.transport.perform(request).await?;

        if let Some(limit) = limit {
            let size = response.body.len() as u64;
            if size > limit {
                return Err(EsError::ResponseTooLarge { limit, size });
            }
        }
        if !response.is_success() && !ignore.contains(&response.status) {
            return Err(EsError::Api(ApiError::from_body(
                response.status,
                &response.body,
            )));
        }
        Ok(response)
    }

    /// `GET /`
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let response = self.perform_request(Request::new(Method::GET, "/")).await?;
        response.json()
    }

    /// Asks the server for its version and remembers it on this client.
    pub async fn discover_version(&mut self) -> Result<Version> {
        let info = self.server_info().await?;
        let version = info.get_semver()?;
        info!(
            "Connected to cluster {} ({}), version {}",
            info.get_name(),
            info.get_hostname(),
            version
        );
        self.version = Some(version.clone());
        Ok(version)
    }

    pub fn bulk(&self) -> BulkService {
        BulkService::new(self.clone())
    }

    pub fn scroll<I, S>(&self, indices: I) -> ScrollService
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScrollService::new(self.clone()).indices(indices)
    }

    pub fn scan<I, S>(&self, indices: I) -> ScanService
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScanService::new(self.clone()).indices(indices)
    }

    pub fn clear_scroll<I, S>(&self, scroll_ids: I) -> ClearScrollService
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClearScrollService::new(self.clone()).scroll_ids(scroll_ids)
    }

    pub fn count<I, S>(&self, indices: I) -> CountService
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CountService::new(self.clone()).indices(indices)
    }

    pub fn open_point_in_time<I, S>(&self, indices: I) -> OpenPointInTimeService
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OpenPointInTimeService::new(self.clone()).indices(indices)
    }

    pub fn close_point_in_time(&self, id: impl Into<String>) -> ClosePointInTimeService {
        ClosePointInTimeService::new(self.clone(), id)
    }

    /// Copies `source_index` into `target_index`, by default on this client.
    pub fn reindex(
        &self,
        source_index: impl Into<String>,
        target_index: impl Into<String>,
    ) -> Reindexer {
        Reindexer::new(self.clone(), source_index, target_index)
    }
}
