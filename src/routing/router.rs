//! Namespace extraction from inbound requests.
//!
//! # Responsibilities
//! - Read the `ns` query parameter from the request URI
//! - Yield an empty candidate when the parameter is absent or empty
//!
//! # Design Decisions
//! - No syntax validation here; the registry decides what is known
//! - First occurrence wins when the parameter repeats
//! - Values are percent-decoded (`form_urlencoded` rules)

use axum::http::{Request, Uri};
use url::form_urlencoded;

/// Query parameter that selects the namespace.
pub const NAMESPACE_PARAM: &str = "ns";

/// Extracts the namespace candidate for a request.
#[derive(Debug, Clone)]
pub struct Router {
    param: String,
}

impl Router {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }

    /// Namespace candidate for `req`; empty if none was given.
    pub fn route<B>(&self, req: &Request<B>) -> String {
        self.candidate(req.uri())
    }

    /// Namespace candidate carried by `uri`.
    pub fn candidate(&self, uri: &Uri) -> String {
        let Some(query) = uri.query() else {
            return String::new();
        };
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == self.param.as_str())
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(NAMESPACE_PARAM)
    }
}
