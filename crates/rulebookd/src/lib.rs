//! rulebookd - drives a rules session from a stream of commands
//!
//! Each input line is a JSON command (a rule match from the inference
//! engine, or a clock advance); each output line is a JSON reply.

mod protocol;

pub use protocol::*;

use rulebook_core::{RuleMatch, RulesSession};
use rulebook_util::{parse_clock_time, RuleName, RulebookError};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors handling a single command
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid time '{0}' (expected RFC 3339 or YYYY-MM-DD HH:MM:SS)")]
    InvalidTime(String),

    #[error(transparent)]
    Session(#[from] RulebookError),
}

/// Applies commands to a session and turns the outcome into replies
pub struct Driver {
    session: RulesSession<MatchToken>,
}

impl Driver {
    pub fn new(session: RulesSession<MatchToken>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &RulesSession<MatchToken> {
        &self.session
    }

    /// Handle one input line. Failures become a single error reply.
    pub fn handle_line(&mut self, line: &str) -> Vec<Reply> {
        let result = serde_json::from_str::<Command>(line)
            .map_err(DriverError::from)
            .and_then(|command| self.handle(command));
        match result {
            Ok(replies) => replies,
            Err(e) => {
                warn!(error = %e, line, "Command rejected");
                vec![Reply::error(e.to_string())]
            }
        }
    }

    pub fn handle(&mut self, command: Command) -> Result<Vec<Reply>, DriverError> {
        debug!(?command, "Handling command");
        let events = match command {
            Command::Match { rule, payload } => {
                let rule_match = RuleMatch::new(RuleName::new(rule), MatchToken::new(payload));
                self.session.process_matches([rule_match])?
            }
            Command::Advance { amount, unit } => self.session.advance_time(amount, unit)?,
            Command::AdvanceTo { time } => {
                let target = parse_clock_time(&time).ok_or(DriverError::InvalidTime(time))?;
                self.session.advance_to(target)?
            }
            Command::Now => return Ok(vec![Reply::now(self.session.now())]),
            Command::Status => {
                let pending = self
                    .session
                    .queue()
                    .pending_rules()
                    .into_iter()
                    .map(PendingStatus::from)
                    .collect();
                return Ok(vec![Reply::Status {
                    now: self.session.now().to_rfc3339(),
                    pending,
                }]);
            }
        };
        Ok(events.into_iter().map(Reply::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulebook_core::BlackoutRegistry;
    use rulebook_util::PseudoClock;

    #[test]
    fn test_bad_lines_become_error_replies() {
        let session = RulesSession::new(BlackoutRegistry::default(), PseudoClock::starting_now());
        let mut driver = Driver::new(session);

        let replies = driver.handle_line("not json");
        assert!(matches!(&replies[..], [Reply::Error { .. }]));

        let replies = driver.handle_line(r#"{"command":"advance_to","time":"yesterday"}"#);
        assert!(matches!(
            &replies[..],
            [Reply::Error { message }] if message.contains("yesterday")
        ));

        let replies =
            driver.handle_line(r#"{"command":"advance_to","time":"2000-01-01T00:00:00Z"}"#);
        assert!(matches!(
            &replies[..],
            [Reply::Error { message }] if message.contains("backward")
        ));
    }

    #[test]
    fn test_match_without_blackout_is_delivered() {
        let session = RulesSession::new(BlackoutRegistry::default(), PseudoClock::starting_now());
        let mut driver = Driver::new(session);

        let replies = driver.handle_line(r#"{"command":"match","rule":"r1","payload":{"i":1}}"#);
        assert!(matches!(
            &replies[..],
            [Reply::Delivered { rule, released: false, payload, .. }]
                if rule == "r1" && payload == &serde_json::json!({"i": 1})
        ));
    }
}
