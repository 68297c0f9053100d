//! HTTP transport used by the client.
//!
//! The client talks to the network only through [`Transport`], so tests can
//! serve canned documents and payloads without a server.

use std::{future::Future, pin::Pin};

use reqwest::Url;
use reqwest::header::HeaderMap;

use crate::error::{Error, Result};
use crate::session::canonical_url;

/// Future type for transport requests.
pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

/// A response as seen by the client.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Final URL after redirects.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body. Empty for `HEAD`.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests on behalf of the client.
///
/// Non-success statuses are returned as responses, not errors; only failures
/// to complete the exchange are errors.
pub trait Transport: Send + Sync {
    /// Perform a `GET` request.
    fn get(&self, url: &Url) -> ResponseFuture<'_>;

    /// Perform a `HEAD` request.
    fn head(&self, url: &Url) -> ResponseFuture<'_>;
}

/// Transport backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> ResponseFuture<'_> {
        Box::pin(send(self.http.get(url.clone()), url.clone(), true))
    }

    fn head(&self, url: &Url) -> ResponseFuture<'_> {
        Box::pin(send(self.http.head(url.clone()), url.clone(), false))
    }
}

async fn send(
    request: reqwest::RequestBuilder,
    url: Url,
    read_body: bool,
) -> Result<TransportResponse> {
    // Error messages never carry the API key.
    let failed = |e: reqwest::Error| Error::Http {
        url: canonical_url(url.as_str()),
        message: e.without_url().to_string(),
    };

    let response = request.send().await.map_err(failed)?;
    let final_url = response.url().clone();
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = if read_body {
        response.bytes().await.map_err(failed)?.to_vec()
    } else {
        Vec::new()
    };

    Ok(TransportResponse {
        url: final_url,
        status,
        headers,
        body,
    })
}
