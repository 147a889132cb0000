//! rulebookd - blackout-aware rule match delivery
//!
//! Loads a rule set, then reads NDJSON commands on stdin and writes NDJSON
//! replies on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use rulebook_config::load_rule_set;
use rulebook_core::RulesSession;
use rulebook_util::{format_instant, parse_clock_time, PseudoClock, START_TIME_ENV_VAR};
use rulebookd::{describe, Driver, Reply};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// rulebookd - Withholds rule matches during blackout windows
#[derive(Parser, Debug)]
#[command(name = "rulebookd")]
#[command(about = "Blackout-aware rule match delivery", long_about = None)]
struct Args {
    /// Rule set file (JSON, or TOML with a .toml extension)
    #[arg(short, long, env = "RULEBOOK_RULES")]
    rules: PathBuf,

    /// Initial pseudo clock time (default: now)
    #[arg(short, long, env = START_TIME_ENV_VAR)]
    start_time: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn build_driver(args: &Args) -> Result<Driver> {
    let policy = load_rule_set(&args.rules)
        .with_context(|| format!("Failed to load rule set from {:?}", args.rules))?;

    let clock = match &args.start_time {
        Some(start) => PseudoClock::new(
            parse_clock_time(start)
                .with_context(|| format!("Invalid start time '{}'", start))?,
        ),
        None => PseudoClock::starting_now(),
    };

    info!(
        rules_path = %args.rules.display(),
        rule_count = policy.rules.len(),
        start = %format_instant(&clock.now()),
        "Rule set loaded"
    );

    Ok(Driver::new(RulesSession::from_policy(&policy, clock)))
}

async fn write_replies(stdout: &mut tokio::io::Stdout, replies: &[Reply]) -> Result<()> {
    for reply in replies {
        debug!(reply = %describe(reply), "Reply");
        let mut line = serde_json::to_vec(reply).context("Failed to encode reply")?;
        line.push(b'\n');
        stdout.write_all(&line).await.context("Failed to write reply")?;
    }
    stdout.flush().await.context("Failed to flush stdout")?;
    Ok(())
}

async fn run(mut driver: Driver) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    info!("Waiting for commands");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("Input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let replies = driver.handle_line(line);
                write_replies(&mut stdout, &replies).await?;
            }
        }
    }

    let pending = driver.session().queue().pending_rules();
    if !pending.is_empty() {
        info!(
            rules = pending.len(),
            matches = pending.iter().map(|p| p.count).sum::<usize>(),
            "Exiting with withheld matches"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries replies, so logs go to stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "rulebookd starting");

    let driver = build_driver(&args)?;
    run(driver).await
}
