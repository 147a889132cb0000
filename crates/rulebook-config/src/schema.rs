//! Raw rule set schema (as parsed from JSON or TOML)

use rulebook_util::RecurrencePoint;
use serde::{Deserialize, Serialize};

/// Raw rule set as parsed from a document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRuleSet {
    /// Rule set name
    #[serde(default)]
    pub name: Option<String>,

    /// Blackout inherited by every rule without its own
    #[serde(default)]
    pub black_out: Option<RawBlackOut>,

    /// Rules, in evaluation order
    #[serde(default)]
    pub rules: Vec<RawRuleEntry>,
}

/// A rule, either wrapped as `{"Rule": {...}}` or given bare
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawRuleEntry {
    Wrapped {
        #[serde(rename = "Rule")]
        rule: RawRule,
    },
    Bare(RawRule),
}

impl RawRuleEntry {
    pub fn rule(&self) -> &RawRule {
        match self {
            RawRuleEntry::Wrapped { rule } | RawRuleEntry::Bare(rule) => rule,
        }
    }

    pub fn into_rule(self) -> RawRule {
        match self {
            RawRuleEntry::Wrapped { rule } | RawRuleEntry::Bare(rule) => rule,
        }
    }
}

impl From<RawRule> for RawRuleEntry {
    fn from(rule: RawRule) -> Self {
        RawRuleEntry::Wrapped { rule }
    }
}

/// Raw rule definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRule {
    /// Unique name within the rule set
    pub name: String,

    /// Rule-specific blackout, overriding the rule set default
    #[serde(default)]
    pub black_out: Option<RawBlackOut>,

    /// Condition tree, evaluated by the inference engine
    #[serde(default)]
    pub condition: Option<serde_json::Value>,

    /// Actions run on firing
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,

    /// Disabled rules never fire (default: enabled)
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Raw blackout definition.
///
/// `trigger` and `timezone` stay strings here so that unknown values are
/// reported by validation alongside every other problem.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBlackOut {
    /// "all" | "first" | "last" (default: "all")
    #[serde(default)]
    pub trigger: Option<String>,

    /// "utc" | "local" (default: "utc")
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub start_time: Option<RecurrencePoint>,

    #[serde(default)]
    pub end_time: Option<RecurrencePoint>,
}
