//! Rule set validation

use crate::schema::{RawBlackOut, RawRuleSet};
use rulebook_util::{validate_bounds, TimezoneMode, Trigger, WindowError};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Where a blackout definition lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlackoutOwner {
    /// The rule set level default
    RuleSet,
    /// A rule's own definition
    Rule(String),
}

impl fmt::Display for BlackoutOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlackoutOwner::RuleSet => write!(f, "rule set default"),
            BlackoutOwner::Rule(name) => write!(f, "rule '{}'", name),
        }
    }
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Rule '{rule}': {message}")]
    RuleError { rule: String, message: String },

    #[error("Duplicate rule name: {0}")]
    DuplicateRuleName(String),

    #[error("Rule #{index} has an empty name")]
    EmptyRuleName { index: usize },

    #[error("Blackout of {owner}: {source}")]
    InvalidBlackout {
        owner: BlackoutOwner,
        #[source]
        source: WindowError,
    },

    #[error("Blackout of {owner}: {message}")]
    InvalidBlackoutSetting {
        owner: BlackoutOwner,
        message: String,
    },
}

/// Validate a raw rule set, collecting every problem found
pub fn validate_rule_set(rule_set: &RawRuleSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Inheriting rules are covered by this check
    if let Some(black_out) = &rule_set.black_out {
        errors.extend(validate_blackout(black_out, BlackoutOwner::RuleSet));
    }

    let mut seen = HashSet::new();
    for (index, entry) in rule_set.rules.iter().enumerate() {
        let rule = entry.rule();

        if rule.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRuleName { index });
        } else if !seen.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRuleName(rule.name.clone()));
        }

        if let Some(black_out) = &rule.black_out {
            errors.extend(validate_blackout(
                black_out,
                BlackoutOwner::Rule(rule.name.clone()),
            ));
        }

        if let Some(action) = rule.actions.iter().find(|a| !a.is_object()) {
            errors.push(ValidationError::RuleError {
                rule: rule.name.clone(),
                message: format!("action must be an object, got {}", action),
            });
        }
    }

    errors
}

/// Validate one blackout definition
pub fn validate_blackout(black_out: &RawBlackOut, owner: BlackoutOwner) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(trigger) = &black_out.trigger
        && let Err(message) = parse_trigger(trigger)
    {
        errors.push(ValidationError::InvalidBlackoutSetting {
            owner: owner.clone(),
            message,
        });
    }

    if let Some(timezone) = &black_out.timezone
        && let Err(message) = parse_timezone(timezone)
    {
        errors.push(ValidationError::InvalidBlackoutSetting {
            owner: owner.clone(),
            message,
        });
    }

    if let Err(source) =
        validate_bounds(black_out.start_time.as_ref(), black_out.end_time.as_ref())
    {
        errors.push(ValidationError::InvalidBlackout { owner, source });
    }

    errors
}

/// Parse a release policy name
pub fn parse_trigger(s: &str) -> Result<Trigger, String> {
    match s.to_lowercase().as_str() {
        "all" => Ok(Trigger::All),
        "first" => Ok(Trigger::First),
        "last" => Ok(Trigger::Last),
        other => Err(format!(
            "Unknown trigger '{}' (expected all, first or last)",
            other
        )),
    }
}

/// Parse a timezone mode name
pub fn parse_timezone(s: &str) -> Result<TimezoneMode, String> {
    match s.to_lowercase().as_str() {
        "utc" => Ok(TimezoneMode::Utc),
        "local" => Ok(TimezoneMode::Local),
        other => Err(format!(
            "Unsupported timezone '{}' (expected utc or local)",
            other
        )),
    }
}
