//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → read by the coordinator, which builds each subsystem from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the namespace set is fixed at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    ListenerConfig, NamespaceConfig, ObservabilityConfig, ProxyConfig, RelayConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
