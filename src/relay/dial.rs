//! Backend connection establishment.
//!
//! Every relay opens its own Unix socket connection and runs an HTTP/1.1
//! handshake over it. The connection is driven by a spawned task that is
//! aborted when its [`ConnectionDriver`] handle is dropped.

use axum::body::Body;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

use crate::namespace::Endpoint;
use crate::relay::RelayError;

/// Owns the task that drives one backend connection.
///
/// Dropping the handle aborts the task and closes the socket, so a caller that
/// goes away mid-response releases the backend connection with it.
#[derive(Debug)]
pub struct ConnectionDriver {
    task: JoinHandle<()>,
}

impl Drop for ConnectionDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Open a fresh connection to `endpoint` and wait until it can take a request.
pub async fn dial(endpoint: &Endpoint) -> Result<(SendRequest<Body>, ConnectionDriver), RelayError> {
    let stream = UnixStream::connect(endpoint.socket_path())
        .await
        .map_err(|source| RelayError::Dial {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|source| RelayError::Handshake {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let namespace = endpoint.namespace().to_string();
    let task = tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(namespace = %namespace, error = %e, "Backend connection ended with error");
        }
    });
    let driver = ConnectionDriver { task };

    sender.ready().await.map_err(|source| RelayError::Handshake {
        endpoint: endpoint.to_string(),
        source,
    })?;

    Ok((sender, driver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn missing_socket_is_dial_error() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::new(dir.path(), "alpha");

        let err = dial(&endpoint).await.unwrap_err();
        assert!(matches!(err, RelayError::Dial { .. }));
        assert!(err.to_string().contains("alpha"));
    }

    #[tokio::test]
    async fn non_socket_path_is_dial_error() {
        let endpoint = Endpoint::new(Path::new("/nonexistent-state-dir"), "beta");
        assert!(matches!(dial(&endpoint).await, Err(RelayError::Dial { .. })));
    }
}
