//! Strongly-typed identifiers for rulebook sessions

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of a rule within a rule set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleName(String);

impl RuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RuleName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for RuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a rule match handed over by the inference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_name_equality() {
        let r1 = RuleName::new("r1");
        let r1_again = RuleName::from("r1");
        let r2 = RuleName::new("r2");

        assert_eq!(r1, r1_again);
        assert_ne!(r1, r2);
    }

    #[test]
    fn match_id_uniqueness() {
        assert_ne!(MatchId::new(), MatchId::new());
    }

    #[test]
    fn ids_serialize_as_plain_values() {
        let name = RuleName::new("notify-on-outage");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"notify-on-outage\"");
        let parsed: RuleName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, parsed);

        let id = MatchId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: MatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
