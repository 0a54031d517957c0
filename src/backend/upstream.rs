//! Pull-through backend that forwards to the namespace's upstream.
//!
//! # Responsibilities
//! - Map a relayed request onto the upstream base URL
//! - Stream the request body up and the response body back
//! - Strip hop-by-hop headers, since this leg is re-framed by the HTTP client
//!
//! # Design Decisions
//! - Upstream query pairs win over same-named request pairs
//! - The `ns` routing parameter is consumed by the proxy and not forwarded
//! - Upstream failures become 502 for that request only

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use url::{form_urlencoded, Url};

use crate::backend::{BackendError, BackendFactory};
use crate::config::NamespaceConfig;
use crate::namespace::Endpoint;
use crate::routing::NAMESPACE_PARAM;

/// Headers meaningful only for a single transport hop.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Default [`BackendFactory`]: one forwarding service per namespace.
#[derive(Debug, Clone)]
pub struct UpstreamBackend {
    client: reqwest::Client,
}

impl UpstreamBackend {
    pub fn new(connect_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::new("*", e))?;
        Ok(Self { client })
    }
}

#[derive(Clone)]
struct UpstreamState {
    client: reqwest::Client,
    upstream: Arc<Url>,
    namespace: Arc<str>,
}

impl BackendFactory for UpstreamBackend {
    fn build(
        &self,
        namespace: &NamespaceConfig,
        _endpoint: &Endpoint,
    ) -> Result<Router, BackendError> {
        let upstream =
            Url::parse(&namespace.upstream).map_err(|e| BackendError::new(&namespace.name, e))?;

        let state = UpstreamState {
            client: self.client.clone(),
            upstream: Arc::new(upstream),
            namespace: namespace.name.as_str().into(),
        };

        Ok(Router::new().fallback(forward).with_state(state))
    }
}

async fn forward(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let target = upstream_url(&state.upstream, &parts.uri);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    tracing::debug!(
        namespace = %state.namespace,
        method = %parts.method,
        target = %target,
        "Forwarding upstream"
    );

    let result = state
        .client
        .request(parts.method, target)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await;

    match result {
        Ok(upstream) => {
            let status = upstream.status();
            let mut headers = upstream.headers().clone();
            strip_hop_by_hop(&mut headers);

            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            tracing::warn!(namespace = %state.namespace, error = %e, "Upstream request failed");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Join the request path onto `base` and merge query pairs.
fn upstream_url(base: &Url, uri: &Uri) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("{}{}", base.path().trim_end_matches('/'), uri.path()));

    let upstream_pairs: Vec<(String, String)> = base.query_pairs().into_owned().collect();
    let taken: HashSet<&str> = upstream_pairs.iter().map(|(k, _)| k.as_str()).collect();
    let request_pairs: Vec<(String, String)> = uri
        .query()
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect::<Vec<(String, String)>>()
        })
        .unwrap_or_default()
        .into_iter()
        .filter(|(k, _)| k != NAMESPACE_PARAM && !taken.contains(k.as_str()))
        .collect();

    url.set_query(None);
    if !upstream_pairs.is_empty() || !request_pairs.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(&upstream_pairs)
            .extend_pairs(&request_pairs);
    }
    url
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn url(base: &str, uri: &str) -> String {
        upstream_url(&Url::parse(base).unwrap(), &uri.parse().unwrap()).to_string()
    }

    #[test]
    fn joins_path_onto_base() {
        assert_eq!(
            url("https://dockerpull.org?ns=docker.io", "/v2/library/alpine/manifests/latest"),
            "https://dockerpull.org/v2/library/alpine/manifests/latest?ns=docker.io"
        );
        assert_eq!(
            url("https://mirror.example/base/", "/v2/"),
            "https://mirror.example/base/v2/"
        );
    }

    #[test]
    fn upstream_query_wins_and_ns_is_dropped() {
        assert_eq!(
            url("https://dockerpull.org?ns=quay.io", "/v2/?ns=beta&n=10"),
            "https://dockerpull.org/v2/?ns=quay.io&n=10"
        );
        assert_eq!(
            url("https://container-registry.oracle.com", "/v2/?ns=container-registry.oracle.com"),
            "https://container-registry.oracle.com/v2/"
        );
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append("x-multi", HeaderValue::from_static("a"));
        headers.append("x-multi", HeaderValue::from_static("b"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-hop").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers.get_all("x-multi").iter().count(), 2);
    }

    #[test]
    fn bad_upstream_fails_build() {
        let backend = UpstreamBackend::new(Duration::from_secs(1)).unwrap();
        let ns = NamespaceConfig {
            name: "alpha".into(),
            upstream: "not a url".into(),
        };
        let endpoint = Endpoint::new(std::path::Path::new("/tmp"), "alpha");
        assert!(backend.build(&ns, &endpoint).is_err());
    }
}
