use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use super::TransportError;
use crate::types::JsonRpcRequest;

/// A 2xx response as received from the endpoint.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Sends one JSON-RPC envelope to an endpoint.
///
/// Implementations return `Ok` only for 2xx responses; every other outcome,
/// including non-2xx responses, is a [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// Configuration for [`HttpTransport`] connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Timeout for establishing a TCP/TLS connection
    pub connect_timeout: Duration,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` header sent with each request
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 16,
            user_agent: concat!("rpc-monitor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// Requests are sent once; there is no retry because every attempt is
/// recorded as its own call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with default pooling settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(&HttpTransportConfig::default())
    }

    /// Creates a transport with the provided pooling settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                TransportError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Maps reqwest failures to short messages that carry no URL or host.
    fn classify_network_error(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::ConnectionFailed("connection refused or unreachable".to_string())
        } else if error.is_body() {
            TransportError::Network("response body error".to_string())
        } else if error.is_decode() {
            TransportError::Network("response decode error".to_string())
        } else if error.is_redirect() {
            TransportError::Network("unexpected redirect".to_string())
        } else if error.is_request() {
            TransportError::Network("request failed".to_string())
        } else {
            TransportError::Network("network error".to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let body = serde_json::to_vec(request).map_err(|e| TransportError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::trace!(method = %request.method, id = request.id, "http request error");
                Self::classify_network_error(&e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| Self::classify_network_error(&e))?;

        if status.is_success() {
            Ok(TransportResponse { status: status.as_u16(), body })
        } else {
            tracing::trace!(
                status = status.as_u16(),
                method = %request.method,
                "http request failed"
            );
            Err(TransportError::HttpStatus { status: status.as_u16(), body })
        }
    }
}
