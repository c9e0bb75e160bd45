//! HTTP transport for discovery calls

use altlb_core::{HttpTransportConfig, LbError, Result};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// Raw response of a discovery GET
#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport used to issue discovery GETs.
///
/// Implementations own TLS, pooling and timeouts; the directory only hands
/// them fully built URLs.
pub trait NodeFetcher: Send + Sync + 'static {
    /// GET `url` and return status and body
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchResponse>> + Send;
}

impl<F: NodeFetcher> NodeFetcher for Arc<F> {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchResponse>> + Send {
        (**self).fetch(url)
    }
}

/// reqwest-backed fetcher
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.ignore_server_certificate_error)
            .pool_max_idle_per_host(config.max_idle_connections_per_host)
            .pool_idle_timeout(config.idle_connection_timeout)
            .build()
            .map_err(|e| LbError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl NodeFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(FetchResponse::new(status, body.to_vec()))
    }
}

fn transport_error(err: reqwest::Error) -> LbError {
    if err.is_timeout() {
        LbError::Timeout
    } else {
        LbError::ConnectionFailed(err.to_string())
    }
}
