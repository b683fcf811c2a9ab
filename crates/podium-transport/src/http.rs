//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// Default per-request timeout. A hung request counts as a network failure.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An [`HttpTransport`] backed by a pooled `reqwest::Client`.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Builds a transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("podium/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self { client })
    }

    /// Wraps an existing client (custom proxies, TLS roots, etc.).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                error = %e,
                "http request failed"
            );
            TransportError::Http(e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(TransportError::Http)?;

        tracing::trace!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "http response"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}
