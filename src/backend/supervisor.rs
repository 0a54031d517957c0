//! Backend supervision.
//!
//! # Responsibilities
//! - Provision the namespace directory and its socket path
//! - Build the backend handler and bind it to the namespace's Unix socket
//! - Signal readiness once bound, then serve until failure
//! - Return the terminal error; restarting is left to whoever runs the process

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::oneshot;

use crate::backend::{BackendError, BackendFactory};
use crate::config::NamespaceConfig;
use crate::namespace::Endpoint;
use crate::observability::metrics;

/// Terminal failures of a backend supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to provision {}: {source}", .path.display())]
    Provision {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("backend for '{namespace}' failed: {source}")]
    Serve {
        namespace: String,
        #[source]
        source: io::Error,
    },

    #[error("backend for '{0}' stopped unexpectedly")]
    Exited(String),
}

/// Owns one namespace's backend for the lifetime of the process.
pub struct BackendSupervisor {
    namespace: NamespaceConfig,
    endpoint: Endpoint,
    factory: Arc<dyn BackendFactory>,
}

impl BackendSupervisor {
    pub fn new(
        namespace: NamespaceConfig,
        endpoint: Endpoint,
        factory: Arc<dyn BackendFactory>,
    ) -> Self {
        Self {
            namespace,
            endpoint,
            factory,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace.name
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Create the namespace directory with its storage root and bind its socket.
    ///
    /// A socket left behind by a previous run is removed first; any other
    /// file occupying the path makes the bind fail.
    pub async fn bind(&self) -> Result<UnixListener, SupervisorError> {
        let storage = self.endpoint.storage_dir();
        tokio::fs::create_dir_all(&storage)
            .await
            .map_err(|source| SupervisorError::Provision {
                path: storage,
                source,
            })?;

        let socket = self.endpoint.socket_path();
        remove_stale_socket(&socket).await?;

        UnixListener::bind(&socket).map_err(|source| SupervisorError::Bind {
            path: socket,
            source,
        })
    }

    /// Build, bind and serve the backend.
    ///
    /// `ready` fires once the socket accepts connections. Never returns `Ok`:
    /// a backend that stops serving is a terminal failure.
    pub async fn run(self, ready: Option<oneshot::Sender<()>>) -> Result<(), SupervisorError> {
        let router = self.factory.build(&self.namespace, &self.endpoint)?;
        let listener = self.bind().await?;

        tracing::info!(
            namespace = %self.namespace.name,
            endpoint = %self.endpoint,
            "Backend listening"
        );
        metrics::record_backend_up(&self.namespace.name, true);
        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        let result = axum::serve(listener, router.into_make_service()).await;
        metrics::record_backend_up(&self.namespace.name, false);

        match result {
            Ok(()) => Err(SupervisorError::Exited(self.namespace.name)),
            Err(source) => Err(SupervisorError::Serve {
                namespace: self.namespace.name,
                source,
            }),
        }
    }
}

async fn remove_stale_socket(path: &Path) -> Result<(), SupervisorError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::debug!(path = %path.display(), "Removing stale socket");
            tokio::fs::remove_file(path)
                .await
                .map_err(|source| SupervisorError::Provision {
                    path: path.to_path_buf(),
                    source,
                })
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SupervisorError::Provision {
            path: path.to_path_buf(),
            source,
        }),
    }
}
