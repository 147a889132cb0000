//! Error types for the rulebook blackout subsystem

use thiserror::Error;

use crate::{RuleName, WindowError};

/// Core error type for rulebook session operations
#[derive(Debug, Error)]
pub enum RulebookError {
    #[error("Rule '{0}' has no blackout window")]
    NoBlackout(RuleName),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Blackout of rule '{rule}': {source}")]
    Blackout {
        rule: RuleName,
        #[source]
        source: WindowError,
    },

    #[error("Clock error: {0}")]
    ClockError(String),
}

impl RulebookError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn blackout(rule: RuleName, source: WindowError) -> Self {
        Self::Blackout { rule, source }
    }

    pub fn clock(msg: impl Into<String>) -> Self {
        Self::ClockError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RulebookError>;
