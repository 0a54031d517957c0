//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the namespace proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Public listener configuration.
    pub listener: ListenerConfig,

    /// Namespaces served by this process, one backend each.
    pub namespaces: Vec<NamespaceConfig>,

    /// Namespace used when a request names none, or an unknown one.
    pub default_namespace: String,

    /// Root directory holding one subdirectory per namespace.
    pub state_dir: PathBuf,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Relay tuning.
    pub relay: RelayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let mirrored = ["docker.io", "quay.io", "registry.k8s.io", "cr.l5d.io"];
        let mut namespaces: Vec<NamespaceConfig> = mirrored
            .iter()
            .map(|name| NamespaceConfig {
                name: name.to_string(),
                upstream: format!("https://dockerpull.org?ns={}", name),
            })
            .collect();
        namespaces.push(NamespaceConfig {
            name: "container-registry.oracle.com".to_string(),
            upstream: "https://container-registry.oracle.com".to_string(),
        });

        Self {
            listener: ListenerConfig::default(),
            namespaces,
            default_namespace: "docker.io".to_string(),
            state_dir: PathBuf::from("./var"),
            timeouts: TimeoutConfig::default(),
            relay: RelayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// One namespace and the upstream its backend mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamespaceConfig {
    /// Namespace identifier, e.g. a registry hostname.
    pub name: String,

    /// Remote URL the namespace's backend forwards to.
    pub upstream: String,
}

/// Timeout configuration for relay operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend dial and handshake timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the backend to produce a response head, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 300,
        }
    }
}

/// Relay tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Largest body frame handed to the caller, in bytes.
    pub chunk_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { chunk_size: 4096 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
