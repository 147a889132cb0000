//! Blackout enforcement for rulebook sessions
//!
//! This crate contains:
//! - The blackout registry (rule name -> validated window, in rule order)
//! - The deferred match queue (per-rule FIFO of withheld matches)
//! - The rules session tying both to a pseudo clock

mod deferred;
mod events;
mod registry;
mod session;

pub use deferred::*;
pub use events::*;
pub use registry::*;
pub use session::*;
