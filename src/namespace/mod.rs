//! Namespace subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ProxyConfig.namespaces + state_dir
//!     → endpoint.rs (derive socket path per namespace)
//!     → registry.rs (freeze as immutable map, check default exists)
//!
//! Per request:
//!     namespace candidate → registry.resolve() → Endpoint
//! ```
//!
//! # Design Decisions
//! - The namespace set is fixed at startup; no runtime registration
//! - Unknown namespaces route to the default instead of failing

pub mod endpoint;
pub mod registry;

pub use endpoint::Endpoint;
pub use registry::{NamespaceRegistry, RegistryError};
