//! Rule set validation CLI tool
//!
//! Validates a rule set file and summarizes each rule's effective blackout.

use rulebook_config::{ConfigError, RulePolicy};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let rules_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-rulebook <rule-set-file>");
            eprintln!();
            eprintln!("Validates a rule set (JSON, or TOML with a .toml extension)");
            eprintln!("and prints the blackout each rule ends up with.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-rulebook rules.json");
            return ExitCode::from(2);
        }
    };

    if !rules_path.exists() {
        eprintln!("Error: Rule set file not found: {}", rules_path.display());
        return ExitCode::from(1);
    }

    match rulebook_config::load_rule_set(&rules_path) {
        Ok(policy) => {
            println!("✓ Rule set is valid");
            println!();
            println!("Summary:");
            println!("  Name: {}", policy.name.as_deref().unwrap_or("<unnamed>"));
            println!("  Rules: {}", policy.rules.len());
            match &policy.default_blackout {
                Some(window) => println!("  Default blackout: {}", window),
                None => println!("  Default blackout: none"),
            }

            if !policy.rules.is_empty() {
                println!();
                println!("Rules:");
                for rule in &policy.rules {
                    println!("  - {}", describe_rule(rule));
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Rule set validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::JsonError(parse_err) => {
                    eprintln!("JSON parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::TomlError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            ExitCode::from(1)
        }
    }
}

fn describe_rule(rule: &RulePolicy) -> String {
    let state = if rule.enabled { "" } else { " (disabled)" };
    match (&rule.blackout, rule.blackout_source) {
        (Some(window), source) => format!(
            "{}{}: {} blackout, trigger {}, {} time [{}]",
            rule.name,
            state,
            window.kind(),
            window.trigger(),
            window.timezone(),
            source
        ),
        (None, _) => format!("{}{}: no blackout", rule.name, state),
    }
}
