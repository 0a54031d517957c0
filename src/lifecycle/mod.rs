//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Starting (coordinator.rs):
//!     Build registry → spawn supervisors → wait until all bound → start listener
//!
//! Running:
//!     Supervisors and listener report terminal errors → fatal.rs (single slot)
//!
//! Terminating:
//!     First fatal error or signal (signals.rs) → abort all tasks → return
//! ```
//!
//! # Design Decisions
//! - Fail fast: any lifecycle error is fatal to the whole process
//! - No restart in-process; the process is expected to be restarted externally
//! - No drain: in-flight relays are abandoned on termination

pub mod coordinator;
pub mod fatal;
pub mod signals;

pub use coordinator::{Coordinator, Phase};
pub use fatal::{fatal_slot, FatalReporter, FatalSlot, LifecycleError};
pub use signals::shutdown_signal;
