//! Core events emitted by a rules session

use chrono::{DateTime, FixedOffset};
use rulebook_util::RuleName;
use serde::{Deserialize, Serialize};

/// A rule firing produced by the inference engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch<M> {
    pub rule: RuleName,
    pub token: M,
}

impl<M> RuleMatch<M> {
    pub fn new(rule: impl Into<RuleName>, token: M) -> Self {
        Self {
            rule: rule.into(),
            token,
        }
    }
}

/// Events emitted by the session, in the order they happen
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent<M> {
    /// Match handed on for normal delivery
    MatchDelivered {
        rule_match: RuleMatch<M>,
        /// Whether the match had been withheld by a blackout
        released: bool,
    },

    /// Match withheld until the rule's blackout ends
    MatchDeferred {
        rule: RuleName,
        until: DateTime<FixedOffset>,
        pending: usize,
    },

    /// A rule's blackout ended; `count` deliveries follow
    MatchesReleased { rule: RuleName, count: usize },
}

impl<M> CoreEvent<M> {
    pub fn into_delivered(self) -> Option<RuleMatch<M>> {
        match self {
            CoreEvent::MatchDelivered { rule_match, .. } => Some(rule_match),
            _ => None,
        }
    }
}

/// Deliveries contained in `events`, in order
pub fn deliveries<M>(events: Vec<CoreEvent<M>>) -> Vec<RuleMatch<M>> {
    events.into_iter().filter_map(CoreEvent::into_delivered).collect()
}
