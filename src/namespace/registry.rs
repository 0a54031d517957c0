//! Namespace lookup.
//!
//! # Responsibilities
//! - Map namespace identifiers to backend endpoints
//! - Fall back to the default namespace for unknown or empty candidates
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) lookup via HashMap
//! - Construction fails if the default namespace is absent, so lookups never fail

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::namespace::Endpoint;

/// Errors building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("default namespace '{0}' is not configured")]
    MissingDefault(String),

    #[error("namespace '{0}' is configured more than once")]
    Duplicate(String),
}

/// Immutable map from namespace to backend endpoint.
#[derive(Debug)]
pub struct NamespaceRegistry {
    endpoints: HashMap<String, Endpoint>,
    default_namespace: String,
}

impl NamespaceRegistry {
    /// Build a registry for `namespaces` rooted at `state_dir`.
    pub fn new<I, S>(
        state_dir: &Path,
        namespaces: I,
        default_namespace: impl Into<String>,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut endpoints = HashMap::new();
        for name in namespaces {
            let name = name.into();
            let endpoint = Endpoint::new(state_dir, name.clone());
            if endpoints.insert(name.clone(), endpoint).is_some() {
                return Err(RegistryError::Duplicate(name));
            }
        }

        let default_namespace = default_namespace.into();
        if !endpoints.contains_key(&default_namespace) {
            return Err(RegistryError::MissingDefault(default_namespace));
        }

        Ok(Self {
            endpoints,
            default_namespace,
        })
    }

    /// Build a registry from the proxy configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RegistryError> {
        Self::new(
            &config.state_dir,
            config.namespaces.iter().map(|ns| ns.name.clone()),
            config.default_namespace.clone(),
        )
    }

    /// Endpoint for `candidate`, or for the default namespace when the
    /// candidate is empty or unknown.
    pub fn resolve(&self, candidate: &str) -> &Endpoint {
        self.endpoints
            .get(candidate)
            .unwrap_or_else(|| &self.endpoints[&self.default_namespace])
    }

    /// The fallback namespace.
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}
