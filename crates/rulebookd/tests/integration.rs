//! Integration tests for rulebookd
//!
//! These tests load rule sets from disk and drive a session end to end
//! through the command interface.

use rulebook_config::load_rule_set;
use rulebook_core::RulesSession;
use rulebook_util::{parse_clock_time, PseudoClock};
use rulebookd::{Driver, Reply};
use std::path::PathBuf;

const RULE_SET_TEMPLATE: &str = r#"
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
            "black_out": BLACK_OUT
         }
      },
      {
         "Rule": {
            "name": "always",
            "actions": [
               { "Action": { "action": "debug", "action_args": {} } }
            ]
         }
      }
   ]
}
"#;

fn write_rule_set(dir: &tempfile::TempDir, black_out: serde_json::Value) -> PathBuf {
    let path = dir.path().join("rules.json");
    let content = RULE_SET_TEMPLATE.replace("BLACK_OUT", &black_out.to_string());
    std::fs::write(&path, content).unwrap();
    path
}

fn driver(black_out: serde_json::Value, start: &str) -> Driver {
    let dir = tempfile::tempdir().unwrap();
    let path = write_rule_set(&dir, black_out);
    let policy = load_rule_set(&path).unwrap();
    let clock = PseudoClock::new(parse_clock_time(start).unwrap());
    Driver::new(RulesSession::from_policy(&policy, clock))
}

fn fire(driver: &mut Driver, rule: &str, i: u32) -> Vec<Reply> {
    let line = serde_json::json!({
        "command": "match",
        "rule": rule,
        "payload": { "sensu": { "data": { "i": i } } }
    });
    driver.handle_line(&line.to_string())
}

fn advance(driver: &mut Driver, amount: u64, unit: &str) -> Vec<Reply> {
    let line = serde_json::json!({ "command": "advance", "amount": amount, "unit": unit });
    driver.handle_line(&line.to_string())
}

/// Payload indices of delivered matches, in order
fn delivered(replies: &[Reply]) -> Vec<u64> {
    replies
        .iter()
        .filter_map(|reply| match reply {
            Reply::Delivered { payload, .. } => payload["sensu"]["data"]["i"].as_u64(),
            _ => None,
        })
        .collect()
}

fn is_deferred(replies: &[Reply]) -> bool {
    matches!(replies, [Reply::Deferred { .. }])
}

fn daily(trigger: &str) -> serde_json::Value {
    serde_json::json!({
        "trigger": trigger,
        "timezone": "utc",
        "start_time": { "minute": 30, "hour": 14 },
        "end_time": { "minute": 15, "hour": 16 }
    })
}

#[test]
fn test_daily_blackout() {
    let mut driver = driver(daily("all"), "2025-02-14T15:00:00Z");

    assert!(is_deferred(&fire(&mut driver, "r1", 1)));
    assert!(advance(&mut driver, 30, "minutes").is_empty());

    let replies = advance(&mut driver, 1, "hours");
    assert!(matches!(&replies[0], Reply::Released { rule, count: 1 } if rule == "r1"));
    assert_eq!(delivered(&replies), vec![1]);

    // Outside the window matches pass straight through
    assert_eq!(delivered(&fire(&mut driver, "r1", 2)), vec![2]);
}

#[test]
fn test_daily_blackout_spanning_midnight() {
    let black_out = serde_json::json!({
        "start_time": { "hour": 22 },
        "end_time": { "hour": 2 }
    });
    let mut driver = driver(black_out, "2025-06-10T23:30:00Z");

    assert!(is_deferred(&fire(&mut driver, "r1", 1)));
    advance(&mut driver, 2, "hours"); // 01:30 next day, still inside
    assert!(is_deferred(&fire(&mut driver, "r1", 2)));

    let replies = advance(&mut driver, 31, "minutes");
    assert_eq!(delivered(&replies), vec![1, 2]);
}

#[test]
fn test_weekly_blackout() {
    // Thursdays 03:00 - 04:00; 2025-02-13 is a Thursday
    let black_out = serde_json::json!({
        "start_time": { "minute": 0, "hour": 3, "day_of_week": 4 },
        "end_time": { "minute": 0, "hour": 4, "day_of_week": 4 }
    });
    let mut driver = driver(black_out, "2025-02-13T03:30:00Z");

    let replies = fire(&mut driver, "r1", 1);
    assert!(matches!(
        &replies[..],
        [Reply::Deferred { until, pending: 1, .. }] if until == "2025-02-13T04:00:00+00:00"
    ));
    assert_eq!(delivered(&advance(&mut driver, 1, "hours")), vec![1]);
}

#[test]
fn test_monthly_blackout_across_month_end() {
    let black_out = serde_json::json!({
        "trigger": "last",
        "start_time": { "hour": 22, "day_of_month": 28 },
        "end_time": { "hour": 6, "day_of_month": 2 }
    });
    let mut driver = driver(black_out, "2025-05-29T23:00:00Z");

    for i in 1..=3 {
        assert!(is_deferred(&fire(&mut driver, "r1", i)));
    }
    // June 2 05:30 is still blacked out
    assert!(advance(&mut driver, 3, "days").is_empty());
    assert!(advance(&mut driver, 390, "minutes").is_empty());
    assert!(is_deferred(&fire(&mut driver, "r1", 4)));

    let replies = advance(&mut driver, 1, "hours");
    assert_eq!(delivered(&replies), vec![4]);
}

#[test]
fn test_annual_blackout_across_year_end() {
    let black_out = serde_json::json!({
        "trigger": "first",
        "timezone": "local",
        "start_time": { "hour": 0, "day_of_month": 23, "month": 12 },
        "end_time": { "hour": 0, "day_of_month": 2, "month": 1 }
    });
    let mut driver = driver(black_out, "2025-12-23 15:00:00");

    assert!(is_deferred(&fire(&mut driver, "r1", 1)));
    assert!(is_deferred(&fire(&mut driver, "r1", 2)));

    assert!(advance(&mut driver, 9, "days").is_empty());
    let replies = advance(&mut driver, 1, "days");
    assert_eq!(delivered(&replies), vec![1]);
}

#[test]
fn test_rules_without_blackout_are_unaffected() {
    let mut driver = driver(daily("all"), "2025-02-14T15:00:00Z");

    assert!(is_deferred(&fire(&mut driver, "r1", 1)));
    assert_eq!(delivered(&fire(&mut driver, "always", 2)), vec![2]);
}

#[test]
fn test_status_and_now() {
    let mut driver = driver(daily("all"), "2025-02-14T15:00:00Z");
    fire(&mut driver, "r1", 1);
    fire(&mut driver, "r1", 2);

    let replies = driver.handle_line(r#"{"command":"status"}"#);
    match &replies[..] {
        [Reply::Status { now, pending }] => {
            assert_eq!(now, "2025-02-14T15:00:00+00:00");
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].rule, "r1");
            assert_eq!(pending[0].count, 2);
            assert_eq!(pending[0].until, "2025-02-14T16:15:00+00:00");
        }
        other => panic!("unexpected replies: {:?}", other),
    }

    let replies = driver.handle_line(r#"{"command":"advance_to","time":"2025-02-14T17:00:00Z"}"#);
    assert_eq!(delivered(&replies), vec![1, 2]);

    let replies = driver.handle_line(r#"{"command":"now"}"#);
    assert_eq!(
        replies,
        vec![Reply::Now {
            now: "2025-02-14T17:00:00+00:00".into()
        }]
    );
}

#[test]
fn test_invalid_rule_set_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_rule_set(
        &dir,
        serde_json::json!({
            "start_time": { "hour": 1, "day_of_month": 31, "month": 4 },
            "end_time": { "hour": 2, "day_of_month": 1, "month": 5 }
        }),
    );

    let err = load_rule_set(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("rule 'r1'"), "{}", message);
    assert!(message.contains("4/31"), "{}", message);
}
