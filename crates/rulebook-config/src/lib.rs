//! Rule set parsing and blackout validation
//!
//! Supports JSON (default) and TOML rule set documents with:
//! - Rules in `{"Rule": {...}}` or bare form
//! - A rule set level blackout inherited by rules without their own
//! - Validation that reports every problem at once

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read rule set file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(errors))]
    ValidationFailed { errors: Vec<ValidationError> },
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate a rule set file; a `.toml` extension selects TOML
pub fn load_rule_set(path: impl AsRef<Path>) -> ConfigResult<RuleSetPolicy> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading rule set");
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        parse_rule_set_toml(&content)
    } else {
        parse_rule_set(&content)
    }
}

/// Parse and validate a rule set from a JSON string
pub fn parse_rule_set(content: &str) -> ConfigResult<RuleSetPolicy> {
    let raw: RawRuleSet = serde_json::from_str(content)?;
    finish(raw)
}

/// Parse and validate a rule set from a TOML string
pub fn parse_rule_set_toml(content: &str) -> ConfigResult<RuleSetPolicy> {
    let raw: RawRuleSet = toml::from_str(content)?;
    finish(raw)
}

fn finish(raw: RawRuleSet) -> ConfigResult<RuleSetPolicy> {
    let errors = validate_rule_set(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    let policy = RuleSetPolicy::from_raw(raw)
        .map_err(|e| ConfigError::ValidationFailed { errors: vec![e] })?;
    info!(
        rule_set = policy.name.as_deref().unwrap_or("<unnamed>"),
        rules = policy.rules.len(),
        with_blackout = policy.rules.iter().filter(|r| r.blackout.is_some()).count(),
        "Rule set loaded"
    );
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulebook_util::{RecurrenceKind, TimezoneMode, Trigger};
    use std::io::Write;

    const ANNUAL_RULE_SET: &str = r#"
        {
           "rules": [
              {
                 "Rule": {
                    "name": "r1",
                    "condition": {
                       "EqualsExpression": {
                          "lhs": { "sensu": "data.i" },
                          "rhs": { "Integer": 1 }
                       }
                    },
                    "actions": [
                       { "Action": { "action": "debug", "action_args": {} } }
                    ],
                    "black_out": {
                       "trigger": "all",
                       "timezone": "local",
                       "start_time": { "minute": 0, "hour": 14, "day_of_month": 1, "month": 7 },
                       "end_time": { "minute": 0, "hour": 16, "day_of_month": 1, "month": 7 }
                    }
                 }
              }
           ]
        }
    "#;

    #[test]
    fn parse_wrapped_rule() {
        let policy = parse_rule_set(ANNUAL_RULE_SET).unwrap();
        assert_eq!(policy.rules.len(), 1);

        let rule = &policy.rules[0];
        assert_eq!(rule.name.as_str(), "r1");
        assert!(rule.enabled);
        assert_eq!(rule.actions.len(), 1);
        assert!(rule.condition.is_some());

        let window = rule.blackout.as_ref().unwrap();
        assert_eq!(window.kind(), RecurrenceKind::Annual);
        assert_eq!(window.timezone(), TimezoneMode::Local);
    }

    #[test]
    fn parse_bare_rules_with_default_blackout() {
        let json = serde_json::json!({
            "name": "nightly",
            "black_out": {
                "trigger": "first",
                "start_time": { "hour": 22 },
                "end_time": { "hour": 2 }
            },
            "rules": [
                { "name": "r1" },
                { "Rule": { "name": "r2" } }
            ]
        });

        let policy = parse_rule_set(&json.to_string()).unwrap();
        assert_eq!(policy.name.as_deref(), Some("nightly"));
        for rule in &policy.rules {
            assert_eq!(rule.blackout_source, BlackoutSource::Inherited);
            assert_eq!(rule.blackout.as_ref().unwrap().trigger(), Trigger::First);
        }
    }

    #[test]
    fn parse_toml_rule_set() {
        let toml = r#"
            name = "maintenance"

            [[rules]]
            name = "patch-window"

            [rules.black_out]
            trigger = "last"
            start_time = { hour = 20, day_of_month = 28 }
            end_time = { hour = 6, day_of_month = 2 }
        "#;

        let policy = parse_rule_set_toml(toml).unwrap();
        let window = policy.rules[0].blackout.as_ref().unwrap();
        assert_eq!(window.kind(), RecurrenceKind::Monthly);
        assert_eq!(window.trigger(), Trigger::Last);
    }

    #[test]
    fn reject_invalid_blackout() {
        let json = serde_json::json!({
            "rules": [{
                "Rule": {
                    "name": "r1",
                    "black_out": {
                        "start_time": { "hour": 1, "day_of_week": 1, "day_of_month": 1 },
                        "end_time": { "hour": 2 }
                    }
                }
            }]
        });

        let err = parse_rule_set(&json.to_string()).unwrap_err();
        match err {
            ConfigError::ValidationFailed { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].to_string().contains("rule 'r1'"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn reject_malformed_json() {
        assert!(matches!(parse_rule_set("{ \"rules\": ["), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn load_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("rules.json");
        std::fs::write(&json_path, ANNUAL_RULE_SET).unwrap();
        assert_eq!(load_rule_set(&json_path).unwrap().rules.len(), 1);

        let toml_path = dir.path().join("rules.toml");
        let mut file = std::fs::File::create(&toml_path).unwrap();
        writeln!(file, "[[rules]]").unwrap();
        writeln!(file, "name = \"r1\"").unwrap();
        drop(file);
        assert_eq!(load_rule_set(&toml_path).unwrap().rules.len(), 1);

        assert!(matches!(
            load_rule_set(dir.path().join("missing.json")),
            Err(ConfigError::ReadError(_))
        ));
    }
}
