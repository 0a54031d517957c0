//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Bounded TCP connection
//!     → server.rs (Axum setup, HTTP/1.x and HTTP/2)
//!     → routing (namespace candidate from `ns`)
//!     → namespace registry (endpoint, default fallback)
//!     → relay engine (backend round trip)
//!     → Send status, headers and streamed body to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
