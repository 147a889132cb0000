//! Blackout registry: effective blackout window per rule

use rulebook_config::RuleSetPolicy;
use rulebook_util::{BlackoutWindow, RuleName, RulebookError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Read-only map from rule name to its effective blackout window.
///
/// Iteration follows rule definition order.
#[derive(Debug, Clone, Default)]
pub struct BlackoutRegistry {
    windows: Vec<(RuleName, BlackoutWindow)>,
    index: HashMap<RuleName, usize>,
}

impl BlackoutRegistry {
    /// Registry for the enabled rules of a validated rule set
    pub fn from_policy(policy: &RuleSetPolicy) -> Self {
        let mut windows = Vec::new();
        let mut index = HashMap::new();
        for rule in policy.enabled_rules() {
            if let Some(window) = &rule.blackout {
                debug!(
                    rule = %rule.name,
                    source = %rule.blackout_source,
                    window = %window,
                    "Blackout registered"
                );
                index.insert(rule.name.clone(), windows.len());
                windows.push((rule.name.clone(), window.clone()));
            }
        }
        Self { windows, index }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Window for `rule`, if it has one
    pub fn get(&self, rule: &str) -> Option<&BlackoutWindow> {
        self.index.get(rule).map(|&i| &self.windows[i].1)
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.index.contains_key(rule)
    }

    /// Windows in rule definition order
    pub fn iter(&self) -> impl Iterator<Item = (&RuleName, &BlackoutWindow)> {
        self.windows.iter().map(|(name, window)| (name, window))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Builds a registry rule by rule, resolving the rule set default once
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    default_window: Option<BlackoutWindow>,
    rules: Vec<(RuleName, Option<BlackoutWindow>)>,
}

impl RegistryBuilder {
    /// Window for rules added without one of their own
    pub fn default_window(mut self, window: BlackoutWindow) -> Self {
        self.default_window = Some(window);
        self
    }

    /// Add a rule, optionally with its own window
    pub fn rule(mut self, name: impl Into<RuleName>, window: Option<BlackoutWindow>) -> Self {
        self.rules.push((name.into(), window));
        self
    }

    pub fn build(self) -> Result<BlackoutRegistry> {
        let mut registry = BlackoutRegistry::default();
        for (name, window) in self.rules {
            if registry.index.contains_key(&name) {
                return Err(RulebookError::config(format!("Duplicate rule name: {}", name)));
            }
            if let Some(window) = window.or_else(|| self.default_window.clone()) {
                registry.index.insert(name.clone(), registry.windows.len());
                registry.windows.push((name, window));
            }
        }
        Ok(registry)
    }
}
