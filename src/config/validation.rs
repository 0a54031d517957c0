//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default namespace is configured)
//! - Validate value ranges (timeouts > 0, chunk size > 0) and addresses
//! - Reject namespace names that would escape the state directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no namespaces configured")]
    NoNamespaces,

    #[error("namespace name must not be empty")]
    EmptyNamespace,

    #[error("namespace '{0}' is configured more than once")]
    DuplicateNamespace(String),

    #[error("namespace '{0}' must not contain path separators or '..'")]
    InvalidNamespace(String),

    #[error("default namespace '{0}' is not configured")]
    MissingDefault(String),

    #[error("namespace '{namespace}' has invalid upstream '{upstream}'")]
    InvalidUpstream { namespace: String, upstream: String },

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.namespaces.is_empty() {
        errors.push(ValidationError::NoNamespaces);
    }

    let mut seen = HashSet::new();
    for ns in &config.namespaces {
        if ns.name.is_empty() {
            errors.push(ValidationError::EmptyNamespace);
            continue;
        }
        if ns.name.contains('/') || ns.name.contains('\\') || ns.name.contains("..") {
            errors.push(ValidationError::InvalidNamespace(ns.name.clone()));
        }
        if !seen.insert(ns.name.as_str()) {
            errors.push(ValidationError::DuplicateNamespace(ns.name.clone()));
        }
        if Url::parse(&ns.upstream).is_err() {
            errors.push(ValidationError::InvalidUpstream {
                namespace: ns.name.clone(),
                upstream: ns.upstream.clone(),
            });
        }
    }

    if !seen.contains(config.default_namespace.as_str()) {
        errors.push(ValidationError::MissingDefault(config.default_namespace.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.relay.chunk_size == 0 {
        errors.push(ValidationError::Zero("relay.chunk_size"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
