//! Shared utilities for the rulebook blackout subsystem
//!
//! This crate provides:
//! - ID types (RuleName, MatchId)
//! - Error types
//! - Pseudo clock and timezone interpretation modes
//! - Recurrence points and the blackout window calendar engine

mod blackout;
mod error;
mod ids;
mod recurrence;
mod time;

pub use blackout::*;
pub use error::*;
pub use ids::*;
pub use recurrence::*;
pub use time::*;
