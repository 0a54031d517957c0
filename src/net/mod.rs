//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents unbounded per-connection fan-out
//! - Each accepted stream carries its own permit

pub mod listener;

pub use listener::{BoundedListener, ListenerError, PermittedStream};
