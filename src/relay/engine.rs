//! Per-request relay to a namespace backend.
//!
//! # Responsibilities
//! - Rebuild the inbound request for the backend (method, path + query, headers)
//! - Dial the resolved endpoint and send the request with the body streaming through
//! - Return the backend's status, headers and a chunked streaming body
//!
//! # Design Decisions
//! - One fresh connection per request; no pooling, no retries
//! - Headers are forwarded verbatim in both directions, repeated names included
//! - Deadlines cover dialing and waiting for the response head only;
//!   body streaming is bounded by the caller, not by a timer

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, HeaderValue, Request, Response, Uri, Version};

use crate::config::ProxyConfig;
use crate::namespace::Endpoint;
use crate::relay::body::{RelayBody, RelayGuard};
use crate::relay::dial::dial;
use crate::relay::{RelayError, TimeoutStage};

/// Stateless relay configured with chunk size and deadlines.
#[derive(Debug, Clone)]
pub struct RelayEngine {
    chunk_size: usize,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl RelayEngine {
    pub fn new(chunk_size: usize, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            chunk_size,
            connect_timeout,
            request_timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.relay.chunk_size,
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.request_secs),
        )
    }

    /// Relay `request` to `endpoint` and return the backend's response.
    ///
    /// The returned body streams from the backend connection; dropping it
    /// closes that connection.
    pub async fn relay(
        &self,
        endpoint: &Endpoint,
        request: Request<Body>,
    ) -> Result<Response<Body>, RelayError> {
        let outbound = outbound_request(request);

        let (mut sender, driver) = tokio::time::timeout(self.connect_timeout, dial(endpoint))
            .await
            .map_err(|_| RelayError::Timeout {
                endpoint: endpoint.to_string(),
                stage: TimeoutStage::Connect,
                after: self.connect_timeout,
            })??;

        let response = tokio::time::timeout(self.request_timeout, sender.send_request(outbound))
            .await
            .map_err(|_| RelayError::Timeout {
                endpoint: endpoint.to_string(),
                stage: TimeoutStage::Response,
                after: self.request_timeout,
            })?
            .map_err(|source| RelayError::Send {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let (parts, incoming) = response.into_parts();
        let body = RelayBody::new(incoming, self.chunk_size, endpoint.namespace())
            .with_guard(RelayGuard::new(driver));

        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Rebuild the inbound request in origin form for the backend.
fn outbound_request(request: Request<Body>) -> Request<Body> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = Uri::from(path_and_query);
    *outbound.version_mut() = Version::HTTP_11;
    *outbound.headers_mut() = parts.headers;

    // HTTP/2 callers carry the host in :authority only.
    if !outbound.headers().contains_key(header::HOST) {
        if let Some(host) = parts
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        {
            outbound.headers_mut().insert(header::HOST, host);
        }
    }

    outbound
}
