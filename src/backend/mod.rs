//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! NamespaceConfig + Endpoint
//!     → BackendFactory::build (opaque request handler as an axum Router)
//!     → supervisor.rs (provision dir, bind Unix socket, serve until failure)
//!     → terminal error reported to the lifecycle coordinator
//!
//! Default handler (upstream.rs):
//!     relayed request → forward to the namespace's upstream → stream back
//! ```
//!
//! # Design Decisions
//! - Backends are reachable only through their Unix socket
//! - One backend instance per namespace, never restarted in-process
//! - The handler is pluggable so the relay can be tested against any service

pub mod supervisor;
pub mod upstream;

use axum::Router;
use thiserror::Error;

use crate::config::NamespaceConfig;
use crate::namespace::Endpoint;

pub use supervisor::{BackendSupervisor, SupervisorError};
pub use upstream::UpstreamBackend;

/// Failure to construct a backend service.
#[derive(Debug, Error)]
#[error("cannot build backend for '{namespace}': {reason}")]
pub struct BackendError {
    pub namespace: String,
    pub reason: String,
}

impl BackendError {
    pub fn new(namespace: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            namespace: namespace.into(),
            reason: reason.to_string(),
        }
    }
}

/// Builds the request handler served on one namespace's endpoint.
pub trait BackendFactory: Send + Sync + 'static {
    fn build(&self, namespace: &NamespaceConfig, endpoint: &Endpoint)
        -> Result<Router, BackendError>;
}

impl<F> BackendFactory for F
where
    F: Fn(&NamespaceConfig, &Endpoint) -> Result<Router, BackendError> + Send + Sync + 'static,
{
    fn build(
        &self,
        namespace: &NamespaceConfig,
        endpoint: &Endpoint,
    ) -> Result<Router, BackendError> {
        self(namespace, endpoint)
    }
}
