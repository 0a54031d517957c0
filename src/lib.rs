//! Namespace-routing container registry proxy library

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod namespace;
pub mod net;
pub mod observability;
pub mod relay;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{Coordinator, LifecycleError, Phase};
