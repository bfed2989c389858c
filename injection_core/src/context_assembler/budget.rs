//! Budget Allocator - greedy, single-pass fill of the turn's token budget.

use std::cmp::Ordering;

use tracing::debug;

use lore_rules::{Rule, RuleId};

/// Injection priority, highest first: always-active rules, then `order`
/// descending, then `token_priority` descending, then oldest first.
pub fn injection_order(a: &Rule, b: &Rule) -> Ordering {
    b.always_active
        .cmp(&a.always_active)
        .then_with(|| b.order.cmp(&a.order))
        .then_with(|| b.token_priority.cmp(&a.token_priority))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Rules chosen for injection, in injection order.
#[derive(Debug, Clone, Default)]
pub struct BudgetAllocation<'a> {
    pub included: Vec<&'a Rule>,
    /// Activated rules that did not fit.
    pub dropped: Vec<RuleId>,
    pub used: u32,
    pub budget: u32,
}

impl BudgetAllocation<'_> {
    /// Budget left after the included rules.
    pub fn remaining(&self) -> u32 {
        self.budget - self.used
    }
}

/// Walk activated rules in priority order, including each one whose weight
/// still fits. A rule that does not fit is dropped for good; later, smaller
/// rules may still be included.
pub fn allocate(mut candidates: Vec<&Rule>, budget: u32) -> BudgetAllocation<'_> {
    candidates.sort_by(|a, b| injection_order(a, b));

    let mut allocation = BudgetAllocation {
        budget,
        ..BudgetAllocation::default()
    };

    for rule in candidates {
        match allocation.used.checked_add(rule.token_weight) {
            Some(total) if total <= budget => {
                allocation.used = total;
                allocation.included.push(rule);
            }
            _ => {
                debug!(
                    rule = %rule.id,
                    weight = rule.token_weight,
                    used = allocation.used,
                    budget,
                    "rule dropped for budget"
                );
                allocation.dropped.push(rule.id);
            }
        }
    }

    allocation
}
