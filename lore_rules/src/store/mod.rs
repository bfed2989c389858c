//! Rule Store - owns every rule and hands out immutable per-turn snapshots.
//!
//! The store is the only place rules are mutated. Evaluation never reads the
//! store directly: it receives a [`RuleSnapshot`], a frozen copy that later
//! edits cannot reach.

mod snapshot;

pub use snapshot::*;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::error::{RuleError, RuleResult};
use crate::rule::{Rule, RuleId};

/// Insertion-ordered collection of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    /// Rules in insertion order.
    rules: Vec<Rule>,

    /// Index: rule ID -> position in `rules`.
    positions: HashMap<RuleId, usize>,

    /// Bumped on every mutation.
    version: u64,
}

impl RuleStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule after validating it.
    ///
    /// The token weight is recomputed from the content on the way in.
    pub fn add(&mut self, mut rule: Rule) -> RuleResult<RuleId> {
        if self.positions.contains_key(&rule.id) {
            return Err(RuleError::DuplicateId(rule.id));
        }

        rule.refresh_token_weight();
        rule.validate()?;

        let id = rule.id;
        self.positions.insert(id, self.rules.len());
        self.rules.push(rule);
        self.version += 1;

        debug!(rule = %id, "rule added");
        Ok(id)
    }

    /// Get a rule by ID.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.positions.get(&id).map(|&pos| &self.rules[pos])
    }

    /// Apply an author edit to a rule.
    ///
    /// The edit runs against a copy; the stored rule only changes if the edited
    /// copy validates. The ID cannot be changed this way.
    pub fn update<F>(&mut self, id: RuleId, edit: F) -> RuleResult<&Rule>
    where
        F: FnOnce(&mut Rule),
    {
        let pos = *self.positions.get(&id).ok_or(RuleError::NotFound(id))?;

        let mut edited = self.rules[pos].clone();
        edit(&mut edited);
        edited.id = id;
        edited.refresh_token_weight();
        edited.validate()?;

        self.rules[pos] = edited;
        self.version += 1;

        debug!(rule = %id, "rule updated");
        Ok(&self.rules[pos])
    }

    /// Activate or deactivate a rule without losing its history.
    pub fn set_active(&mut self, id: RuleId, active: bool) -> RuleResult<()> {
        let pos = *self.positions.get(&id).ok_or(RuleError::NotFound(id))?;
        self.rules[pos].is_active = active;
        self.version += 1;
        Ok(())
    }

    /// Remove a rule from the store.
    pub fn remove(&mut self, id: RuleId) -> Option<Rule> {
        let pos = self.positions.remove(&id)?;
        let rule = self.rules.remove(pos);

        // Shift positions of everything after the removed rule
        for later in &self.rules[pos..] {
            if let Some(p) = self.positions.get_mut(&later.id) {
                *p -= 1;
            }
        }

        self.version += 1;
        debug!(rule = %id, "rule removed");
        Some(rule)
    }

    /// Apply the bookkeeping of a finished turn.
    ///
    /// Every listed rule gets its activation count bumped and its last
    /// activation set to `turn`. Returns how many rules were found.
    pub fn record_activations(&mut self, ids: &[RuleId], turn: u64) -> usize {
        let mut recorded = 0;

        for id in ids {
            if let Some(&pos) = self.positions.get(id) {
                self.rules[pos].record_activation(turn);
                recorded += 1;
            }
        }

        if recorded > 0 {
            self.version += 1;
        }
        recorded
    }

    /// Freeze the current rules into a snapshot for one evaluation pass.
    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot::new(self.version, Arc::from(self.rules.as_slice()))
    }

    /// Iterate over all rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get the total number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the store has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check if a rule exists.
    pub fn contains(&self, id: RuleId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Current version; changes whenever any rule changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All distinct categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rules in a given category.
    pub fn by_category(&self, category: &str) -> Vec<&Rule> {
        self.rules.iter().filter(|r| r.category == category).collect()
    }
}
