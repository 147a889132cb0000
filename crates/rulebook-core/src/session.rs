//! Rules session: pseudo clock plus blackout enforcement

use chrono::{DateTime, Utc};
use rulebook_config::RuleSetPolicy;
use rulebook_util::{format_instant, PseudoClock, Result, TimeUnit};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{BlackoutRegistry, CoreEvent, DeferredMatchQueue, RuleMatch};

/// Session owning the clock, the blackout registry and the deferred queue
#[derive(Debug)]
pub struct RulesSession<M> {
    clock: PseudoClock,
    queue: DeferredMatchQueue<M>,
}

impl<M> RulesSession<M> {
    pub fn new(registry: BlackoutRegistry, clock: PseudoClock) -> Self {
        info!(
            blackout_rules = registry.len(),
            now = %format_instant(&clock.now()),
            "Rules session initialized"
        );
        Self {
            clock,
            queue: DeferredMatchQueue::new(Arc::new(registry)),
        }
    }

    pub fn from_policy(policy: &RuleSetPolicy, clock: PseudoClock) -> Self {
        Self::new(BlackoutRegistry::from_policy(policy), clock)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn registry(&self) -> &BlackoutRegistry {
        self.queue.registry()
    }

    pub fn queue(&self) -> &DeferredMatchQueue<M> {
        &self.queue
    }

    /// Route matches from the inference engine.
    ///
    /// Matches of rules in blackout are withheld; the rest are delivered in
    /// order. Elapsed blackouts are flushed afterwards.
    pub fn process_matches(
        &self,
        matches: impl IntoIterator<Item = RuleMatch<M>>,
    ) -> Result<Vec<CoreEvent<M>>> {
        let now = self.clock.now();
        let mut events = Vec::new();

        for rule_match in matches {
            let rule = rule_match.rule.as_str();
            if self.queue.is_in_blackout(rule, &now)? {
                let rule = rule_match.rule.clone();
                let until = self.queue.defer(rule.as_str(), rule_match.token, &now)?;
                let pending = self.queue.pending_count(rule.as_str());
                events.push(CoreEvent::MatchDeferred {
                    rule,
                    until,
                    pending,
                });
            } else {
                debug!(rule, "Match delivered");
                events.push(CoreEvent::MatchDelivered {
                    rule_match,
                    released: false,
                });
            }
        }

        events.extend(self.flush());
        Ok(events)
    }

    /// Advance the clock by `amount` of `unit`, then flush
    pub fn advance_time(&mut self, amount: u64, unit: TimeUnit) -> Result<Vec<CoreEvent<M>>> {
        let now = self.clock.advance(amount, unit)?;
        debug!(amount, unit = ?unit, now = %format_instant(&now), "Clock advanced");
        Ok(self.flush())
    }

    /// Advance the clock to `target`, then flush. Moving backward is refused.
    pub fn advance_to(&mut self, target: DateTime<Utc>) -> Result<Vec<CoreEvent<M>>> {
        let now = self.clock.advance_to(target)?;
        debug!(now = %format_instant(&now), "Clock advanced");
        Ok(self.flush())
    }

    /// Release matches whose blackout has ended at the current clock time
    pub fn flush(&self) -> Vec<CoreEvent<M>> {
        let mut events = Vec::new();
        for release in self.queue.flush_elapsed_by_rule(&self.clock.now()) {
            events.push(CoreEvent::MatchesReleased {
                rule: release.rule.clone(),
                count: release.matches.len(),
            });
            events.extend(release.matches.into_iter().map(|token| CoreEvent::MatchDelivered {
                rule_match: RuleMatch {
                    rule: release.rule.clone(),
                    token,
                },
                released: true,
            }));
        }
        events
    }
}
