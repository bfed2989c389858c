//! Immutable rule snapshots handed to the evaluation pipeline.

use std::sync::Arc;

use crate::rule::{Rule, RuleId};

/// A frozen, cheaply clonable view of the store at one version.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    version: u64,
    rules: Arc<[Rule]>,
}

impl RuleSnapshot {
    pub(crate) fn new(version: u64, rules: Arc<[Rule]>) -> Self {
        Self { version, rules }
    }

    /// Build a snapshot directly from rules, outside any store.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self::new(0, Arc::from(rules))
    }

    /// Store version this snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterate over the rules in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get a rule by ID.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSnapshot {
    fn default() -> Self {
        Self::from_rules(Vec::new())
    }
}
