//! Relay engine subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved Endpoint + inbound Request
//!     → engine.rs (rebuild request in origin form)
//!     → dial.rs (fresh Unix socket + HTTP/1.1 handshake)
//!     → send request, body streams through
//!     → body.rs (chunked response body, owns the connection)
//!     → Response handed back to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - At most one backend round trip per inbound request
//! - No state survives a request; concurrent relays share nothing
//! - Failures before the response head become a 5xx for that request only

pub mod body;
pub mod dial;
pub mod engine;

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

pub use body::RelayBody;
pub use dial::{dial, ConnectionDriver};
pub use engine::RelayEngine;

/// Relay step that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    /// Dialing the socket and the HTTP handshake.
    Connect,
    /// Sending the request until the response head arrives.
    Response,
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutStage::Connect => f.write_str("connect"),
            TimeoutStage::Response => f.write_str("response"),
        }
    }
}

/// Errors that end a relay before the response head reaches the caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to connect to {endpoint}: {source}")]
    Dial {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake with {endpoint} failed: {source}")]
    Handshake {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },

    #[error("request to {endpoint} failed: {source}")]
    Send {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },

    #[error("{stage} to {endpoint} timed out after {after:?}")]
    Timeout {
        endpoint: String,
        stage: TimeoutStage,
        after: Duration,
    },
}

impl RelayError {
    /// Status returned to the caller for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_dial(&self) -> bool {
        matches!(
            self,
            RelayError::Dial { .. }
                | RelayError::Handshake { .. }
                | RelayError::Timeout {
                    stage: TimeoutStage::Connect,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout(stage: TimeoutStage) -> RelayError {
        RelayError::Timeout {
            endpoint: "unix:/state/alpha/registry.sock".into(),
            stage,
            after: Duration::from_millis(300),
        }
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let connect = timeout(TimeoutStage::Connect);
        let response = timeout(TimeoutStage::Response);

        assert_eq!(connect.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(connect.is_dial());
        assert!(!response.is_dial());
        assert_eq!(
            response.to_string(),
            "response to unix:/state/alpha/registry.sock timed out after 300ms"
        );
    }

    #[test]
    fn dial_failure_is_bad_gateway() {
        let err = RelayError::Dial {
            endpoint: "unix:/state/alpha/registry.sock".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.is_dial());
    }
}
