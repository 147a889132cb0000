//! Deferred match queue: matches withheld during a blackout
//!
//! Each rule with withheld matches has one entry holding the end of its
//! blackout and a FIFO of match tokens. Entries are created on first
//! deferral and removed once flushed.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use rulebook_util::{RuleName, RulebookError, Result, Trigger};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::BlackoutRegistry;

#[derive(Debug)]
struct PendingRule<M> {
    until: DateTime<FixedOffset>,
    matches: VecDeque<M>,
}

/// Matches released for one rule by a flush
#[derive(Debug, Clone, PartialEq)]
pub struct Release<M> {
    pub rule: RuleName,
    pub matches: Vec<M>,
}

/// Snapshot of one rule's withheld matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSummary {
    pub rule: RuleName,
    pub count: usize,
    pub until: DateTime<FixedOffset>,
}

/// Per-session store of withheld matches.
///
/// All operations take `&self`; state sits behind a single mutex, so the
/// queue can be shared across threads.
#[derive(Debug)]
pub struct DeferredMatchQueue<M> {
    registry: Arc<BlackoutRegistry>,
    pending: Mutex<HashMap<RuleName, PendingRule<M>>>,
}

impl<M> DeferredMatchQueue<M> {
    pub fn new(registry: Arc<BlackoutRegistry>) -> Self {
        Self {
            registry,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &BlackoutRegistry {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RuleName, PendingRule<M>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether `rule` is inside its blackout at `now`.
    ///
    /// Rules without a window are never in blackout.
    pub fn is_in_blackout<Tz: TimeZone>(&self, rule: &str, now: &DateTime<Tz>) -> Result<bool> {
        match self.registry.get(rule) {
            Some(window) => window
                .is_active(now)
                .map_err(|e| RulebookError::blackout(RuleName::new(rule), e)),
            None => Ok(false),
        }
    }

    /// Withhold `token` until the end of `rule`'s current blackout.
    ///
    /// The rule's recorded end is overwritten by every deferral. Returns
    /// that end.
    pub fn defer<Tz: TimeZone>(
        &self,
        rule: &str,
        token: M,
        now: &DateTime<Tz>,
    ) -> Result<DateTime<FixedOffset>> {
        let window = self
            .registry
            .get(rule)
            .ok_or_else(|| RulebookError::NoBlackout(RuleName::new(rule)))?;
        let until = window
            .next_end_instant(now)
            .map_err(|e| RulebookError::blackout(RuleName::new(rule), e))?;

        let mut pending = self.lock();
        let entry = pending
            .entry(RuleName::new(rule))
            .or_insert_with(|| PendingRule {
                until,
                matches: VecDeque::new(),
            });
        entry.until = until;
        entry.matches.push_back(token);

        debug!(rule, until = %until, pending = entry.matches.len(), "Match deferred");
        Ok(until)
    }

    /// Release matches of every rule whose blackout ended strictly before
    /// `now`, grouped by rule in registry order.
    ///
    /// Each rule's trigger decides what is released; its entry is removed
    /// either way.
    pub fn flush_elapsed_by_rule<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<Release<M>> {
        let now = now.with_timezone(&Utc);
        let mut pending = self.lock();
        if pending.is_empty() {
            return Vec::new();
        }

        let mut released = Vec::new();
        for (rule, window) in self.registry.iter() {
            let elapsed = pending
                .get(rule)
                .is_some_and(|entry| entry.until.with_timezone(&Utc) < now);
            if !elapsed {
                continue;
            }
            let Some(entry) = pending.remove(rule) else {
                continue;
            };

            let deferred = entry.matches.len();
            let mut matches = entry.matches;
            let matches: Vec<M> = match window.trigger() {
                Trigger::All => matches.into_iter().collect(),
                Trigger::First => matches.pop_front().into_iter().collect(),
                Trigger::Last => matches.pop_back().into_iter().collect(),
            };

            info!(
                rule = %rule,
                trigger = %window.trigger(),
                deferred,
                released = matches.len(),
                "Blackout ended, releasing matches"
            );
            released.push(Release {
                rule: rule.clone(),
                matches,
            });
        }
        released
    }

    /// Release matches whose blackout ended strictly before `now`, as one
    /// batch in registry order
    pub fn flush_elapsed<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<M> {
        self.flush_elapsed_by_rule(now)
            .into_iter()
            .flat_map(|release| release.matches)
            .collect()
    }

    /// Number of matches withheld for `rule`
    pub fn pending_count(&self, rule: &str) -> usize {
        self.lock().get(rule).map_or(0, |entry| entry.matches.len())
    }

    /// Whether `rule` currently has withheld matches
    pub fn has_pending(&self, rule: &str) -> bool {
        self.lock().contains_key(rule)
    }

    /// Rules with withheld matches, in registry order
    pub fn pending_rules(&self) -> Vec<PendingSummary> {
        let pending = self.lock();
        self.registry
            .iter()
            .filter_map(|(rule, _)| {
                pending.get(rule).map(|entry| PendingSummary {
                    rule: rule.clone(),
                    count: entry.matches.len(),
                    until: entry.until,
                })
            })
            .collect()
    }
}
