//! HTTP transport abstraction.
//!
//! The dispatcher and the refresh coordinator talk to the network through
//! the `Transport` trait rather than a concrete client, so the retry and
//! single-flight logic is unit-testable without sockets. `HttpTransport` is
//! the reqwest-backed implementation used at runtime.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;

use crate::config::AUTH_SURFACE_PREFIXES;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Which surface an endpoint belongs to. Decides whether a 403 is a
/// terminal session failure or an ordinary permission error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Auth,
    Resource,
}

impl EndpointClass {
    /// Classify a URL by its path against the auth-surface prefix list.
    pub fn classify(url: &str) -> Self {
        let path = path_of(url);
        if AUTH_SURFACE_PREFIXES.iter().any(|p| path.starts_with(p)) {
            EndpointClass::Auth
        } else {
            EndpointClass::Resource
        }
    }
}

fn path_of(url: &str) -> &str {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => &rest[path_start..],
                None => "/",
            }
        }
        None => url,
    }
}

/// An outbound request in transport-neutral form. Bodies are JSON values so
/// a request can be replayed byte-identically after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub class: EndpointClass,
}

impl ApiRequest {
    pub fn get(url: String) -> Self {
        Self::new(Method::GET, url, None)
    }

    pub fn post(url: String, body: serde_json::Value) -> Self {
        Self::new(Method::POST, url, Some(body))
    }

    pub fn put(url: String, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, url, Some(body))
    }

    pub fn delete(url: String) -> Self {
        Self::new(Method::DELETE, url, None)
    }

    fn new(method: Method, url: String, body: Option<serde_json::Value>) -> Self {
        let class = EndpointClass::classify(&url);
        Self {
            method,
            url,
            body,
            class,
        }
    }
}

/// Status and body of a response, already read off the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request, attaching `bearer` as the Authorization
    /// credential when present. A missing token is not an error at this
    /// layer - the call goes out unauthenticated and the server decides.
    async fn execute(
        &self,
        req: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        req: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        let mut builder = self.client.request(req.method.clone(), &req.url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

// ============================================================================
// Test transport
// ============================================================================
