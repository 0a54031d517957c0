//! Backend endpoint addressing.
//!
//! Every namespace owns a directory under the state root. Its backend listens
//! on a Unix socket inside that directory and keeps its storage next to it.

use std::fmt;
use std::path::{Path, PathBuf};

const SOCKET_FILE: &str = "registry.sock";
const STORAGE_DIR: &str = "registry";

/// Local address of one namespace's backend service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    namespace: String,
    dir: PathBuf,
}

impl Endpoint {
    /// Derive the endpoint for `namespace` under `state_dir`.
    pub fn new(state_dir: &Path, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let dir = state_dir.join(&namespace);
        Self { namespace, dir }
    }

    /// Namespace this endpoint belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Unix socket path the backend binds.
    pub fn socket_path(&self) -> PathBuf {
        self.dir.join(SOCKET_FILE)
    }

    /// Storage root reserved for the backend.
    pub fn storage_dir(&self) -> PathBuf {
        self.dir.join(STORAGE_DIR)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unix:{}", self.socket_path().display())
    }
}
