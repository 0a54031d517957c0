//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (extract `ns` candidate)
//!     → namespace::NamespaceRegistry::resolve (known → its endpoint, else default)
//! ```
//!
//! # Design Decisions
//! - Deterministic: same URI always yields the same candidate
//! - Permissive: unknown namespaces are not an error

pub mod router;

pub use router::{Router, NAMESPACE_PARAM};
