//! Fatal error reporting.
//!
//! A single-slot channel shared by every supervised task. The first report
//! claims the slot; later reports are dropped without blocking, since the
//! process terminates on the first failure anyway.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::SupervisorError;
use crate::namespace::RegistryError;
use crate::net::ListenerError;

/// Errors that end the whole process.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] RegistryError),

    #[error("backend '{namespace}' failed: {source}")]
    Backend {
        namespace: String,
        #[source]
        source: SupervisorError,
    },

    #[error("public listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("public server failed: {0}")]
    Server(#[source] io::Error),

    #[error("supervised task ended without reporting: {0}")]
    Task(String),
}

/// Create a connected reporter/slot pair.
pub fn fatal_slot() -> (FatalReporter, FatalSlot) {
    let (tx, rx) = mpsc::channel(1);
    let reporter = FatalReporter {
        tx,
        claimed: Arc::new(AtomicBool::new(false)),
    };
    (reporter, FatalSlot { rx })
}

/// Write side, cloned into every supervised task.
#[derive(Debug, Clone)]
pub struct FatalReporter {
    tx: mpsc::Sender<LifecycleError>,
    claimed: Arc<AtomicBool>,
}

impl FatalReporter {
    /// Report `err`. Returns false if another error got there first.
    pub fn report(&self, err: LifecycleError) -> bool {
        if self.claimed.swap(true, Ordering::SeqCst) {
            tracing::debug!(error = %err, "Dropping fatal error; one was already reported");
            return false;
        }

        if let Err(e) = self.tx.try_send(err) {
            tracing::debug!(error = %e, "Fatal error slot unavailable");
            return false;
        }
        true
    }
}

/// Read side, owned by the coordinator.
#[derive(Debug)]
pub struct FatalSlot {
    rx: mpsc::Receiver<LifecycleError>,
}

impl FatalSlot {
    /// Wait for the first fatal error.
    pub async fn recv(&mut self) -> Option<LifecycleError> {
        self.rx.recv().await
    }

    /// Take the reported error, if one is waiting.
    pub fn try_recv(&mut self) -> Option<LifecycleError> {
        self.rx.try_recv().ok()
    }
}
