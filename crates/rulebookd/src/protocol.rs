//! NDJSON wire types: one command per input line, one reply per output line

use chrono::{DateTime, FixedOffset, Utc};
use rulebook_core::{CoreEvent, PendingSummary};
use rulebook_util::{MatchId, TimeUnit};
use serde::{Deserialize, Serialize};

/// Command read from stdin
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// The inference engine fired `rule`
    Match {
        rule: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Advance the pseudo clock by a span
    Advance { amount: u64, unit: TimeUnit },
    /// Advance the pseudo clock to an instant
    AdvanceTo { time: String },
    /// Report the pseudo clock time
    Now,
    /// Report withheld matches
    Status,
}

/// A match as carried through the session
#[derive(Debug, Clone, PartialEq)]
pub struct MatchToken {
    pub id: MatchId,
    pub payload: serde_json::Value,
}

impl MatchToken {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: MatchId::new(),
            payload,
        }
    }
}

/// Withheld matches of one rule
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PendingStatus {
    pub rule: String,
    pub count: usize,
    pub until: String,
}

impl From<PendingSummary> for PendingStatus {
    fn from(summary: PendingSummary) -> Self {
        Self {
            rule: summary.rule.to_string(),
            count: summary.count,
            until: summary.until.to_rfc3339(),
        }
    }
}

/// Reply written to stdout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Delivered {
        rule: String,
        match_id: MatchId,
        released: bool,
        payload: serde_json::Value,
    },
    Deferred {
        rule: String,
        until: String,
        pending: usize,
    },
    Released {
        rule: String,
        count: usize,
    },
    Now {
        now: String,
    },
    Status {
        now: String,
        pending: Vec<PendingStatus>,
    },
    Error {
        message: String,
    },
}

impl Reply {
    pub fn now(now: DateTime<Utc>) -> Self {
        Reply::Now {
            now: now.to_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error {
            message: message.into(),
        }
    }

    fn deferred(rule: String, until: DateTime<FixedOffset>, pending: usize) -> Self {
        Reply::Deferred {
            rule,
            until: until.to_rfc3339(),
            pending,
        }
    }
}

impl From<CoreEvent<MatchToken>> for Reply {
    fn from(event: CoreEvent<MatchToken>) -> Self {
        match event {
            CoreEvent::MatchDelivered {
                rule_match,
                released,
            } => Reply::Delivered {
                rule: rule_match.rule.to_string(),
                match_id: rule_match.token.id,
                released,
                payload: rule_match.token.payload,
            },
            CoreEvent::MatchDeferred {
                rule,
                until,
                pending,
            } => Reply::deferred(rule.to_string(), until, pending),
            CoreEvent::MatchesReleased { rule, count } => Reply::Released {
                rule: rule.to_string(),
                count,
            },
        }
    }
}

/// Human readable form of a reply for logs
pub fn describe(reply: &Reply) -> String {
    match reply {
        Reply::Delivered { rule, released, .. } => {
            format!("{} delivered{}", rule, if *released { " (released)" } else { "" })
        }
        Reply::Deferred { rule, until, .. } => format!("{} deferred until {}", rule, until),
        Reply::Released { rule, count } => format!("{} released {}", rule, count),
        Reply::Now { now } => format!("now {}", now),
        Reply::Status { pending, .. } => format!("{} rules pending", pending.len()),
        Reply::Error { message } => format!("error: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"match","rule":"r1","payload":{"i":1}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Match {
                rule: "r1".into(),
                payload: serde_json::json!({"i": 1}),
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"command":"advance","amount":2,"unit":"hours"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Advance {
                amount: 2,
                unit: TimeUnit::Hours,
            }
        );

        let cmd: Command = serde_json::from_str(r#"{"command":"status"}"#).unwrap();
        assert_eq!(cmd, Command::Status);

        assert!(serde_json::from_str::<Command>(r#"{"command":"retract"}"#).is_err());
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply = Reply::Released {
            rule: "r1".into(),
            count: 3,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"type": "released", "rule": "r1", "count": 3}));
    }
}
