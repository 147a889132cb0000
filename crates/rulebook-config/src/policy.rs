//! Validated rule set structures

use crate::schema::{RawBlackOut, RawRule, RawRuleSet};
use crate::validation::{parse_timezone, parse_trigger, BlackoutOwner, ValidationError};
use rulebook_util::{Boundary, BlackoutWindow, RuleName, TimezoneMode, Trigger, WindowError};
use std::fmt;

/// Where a rule's effective blackout comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlackoutSource {
    /// The rule defines its own
    Own,
    /// Inherited from the rule set default
    Inherited,
    /// No blackout applies
    None,
}

impl fmt::Display for BlackoutSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlackoutSource::Own => write!(f, "own"),
            BlackoutSource::Inherited => write!(f, "inherited"),
            BlackoutSource::None => write!(f, "none"),
        }
    }
}

/// Validated rule set ready for use by a rules session
#[derive(Debug, Clone)]
pub struct RuleSetPolicy {
    pub name: Option<String>,

    /// Blackout applied to rules without their own
    pub default_blackout: Option<BlackoutWindow>,

    /// Rules in definition order
    pub rules: Vec<RulePolicy>,
}

impl RuleSetPolicy {
    /// Convert from a raw rule set (after validation).
    ///
    /// Resolves each rule's effective blackout: its own definition, else the
    /// rule set default, else none.
    pub fn from_raw(raw: RawRuleSet) -> Result<Self, ValidationError> {
        let default_blackout = raw
            .black_out
            .as_ref()
            .map(|b| build_window(b, BlackoutOwner::RuleSet))
            .transpose()?;

        let rules = raw
            .rules
            .into_iter()
            .map(|entry| RulePolicy::from_raw(entry.into_rule(), default_blackout.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: raw.name,
            default_blackout,
            rules,
        })
    }

    /// Get rule by name
    pub fn get_rule(&self, name: &str) -> Option<&RulePolicy> {
        self.rules.iter().find(|r| r.name.as_str() == name)
    }

    /// Rules that take part in evaluation
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RulePolicy> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

/// Validated rule definition
#[derive(Debug, Clone)]
pub struct RulePolicy {
    pub name: RuleName,
    pub enabled: bool,
    pub blackout: Option<BlackoutWindow>,
    pub blackout_source: BlackoutSource,
    pub condition: Option<serde_json::Value>,
    pub actions: Vec<serde_json::Value>,
}

impl RulePolicy {
    fn from_raw(
        raw: RawRule,
        default_blackout: Option<&BlackoutWindow>,
    ) -> Result<Self, ValidationError> {
        let (blackout, blackout_source) = match (&raw.black_out, default_blackout) {
            (Some(own), _) => (
                Some(build_window(own, BlackoutOwner::Rule(raw.name.clone()))?),
                BlackoutSource::Own,
            ),
            (None, Some(default)) => (Some(default.clone()), BlackoutSource::Inherited),
            (None, None) => (None, BlackoutSource::None),
        };

        Ok(Self {
            name: RuleName::new(raw.name),
            enabled: raw.enabled.unwrap_or(true),
            blackout,
            blackout_source,
            condition: raw.condition,
            actions: raw.actions,
        })
    }
}

fn build_window(
    raw: &RawBlackOut,
    owner: BlackoutOwner,
) -> Result<BlackoutWindow, ValidationError> {
    let setting_error = |message| ValidationError::InvalidBlackoutSetting {
        owner: owner.clone(),
        message,
    };
    let trigger = match &raw.trigger {
        Some(t) => parse_trigger(t).map_err(setting_error)?,
        None => Trigger::default(),
    };
    let timezone = match &raw.timezone {
        Some(tz) => parse_timezone(tz).map_err(setting_error)?,
        None => TimezoneMode::default(),
    };

    let window = match (raw.start_time, raw.end_time) {
        (Some(start), Some(end)) => BlackoutWindow::new(start, end, trigger, timezone),
        (None, _) => Err(WindowError::MissingBoundary(Boundary::Start)),
        (Some(_), None) => Err(WindowError::MissingBoundary(Boundary::End)),
    };
    window.map_err(|source| ValidationError::InvalidBlackout { owner, source })
}
