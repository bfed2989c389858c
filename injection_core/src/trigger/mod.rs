//! Trigger Evaluator - decides whether a rule's keywords fire on the scan text.
//!
//! | Logic     | Fires when                  | Empty keyword set |
//! |-----------|-----------------------------|-------------------|
//! | `ANY`     | some keyword matches        | false             |
//! | `ALL`     | every keyword matches       | true              |
//! | `NOT_ALL` | some keyword does not match | false             |
//! | `NOT_ANY` | no keyword matches          | true              |

mod matcher;

pub use matcher::*;

use lore_rules::{Rule, TriggerLogic};
use tracing::trace;

use crate::config::SecondaryKeywordMode;

/// Combine per-keyword match results under a logic mode.
pub fn evaluate_logic<F>(logic: TriggerLogic, keywords: &[String], mut is_match: F) -> bool
where
    F: FnMut(&str) -> bool,
{
    match logic {
        TriggerLogic::Any => keywords.iter().any(|k| is_match(k)),
        TriggerLogic::All => keywords.iter().all(|k| is_match(k)),
        TriggerLogic::NotAll => !keywords.iter().all(|k| is_match(k)),
        TriggerLogic::NotAny => !keywords.iter().any(|k| is_match(k)),
    }
}

/// Evaluates rule triggers against scan text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerEvaluator {
    secondary: SecondaryKeywordMode,
}

impl TriggerEvaluator {
    /// Create an evaluator with the given secondary keyword handling.
    pub fn new(secondary: SecondaryKeywordMode) -> Self {
        Self { secondary }
    }

    /// Check whether a rule's keywords fire on `scan_text`.
    ///
    /// Only meaningful for triggered rules; always-active rules are never
    /// sent here.
    pub fn evaluate(&self, rule: &Rule, scan_text: &str) -> bool {
        let matcher = KeywordMatcher::for_rule(rule);
        let haystack = matcher.fold(scan_text);

        let primary = evaluate_logic(rule.logic, &rule.keywords, |k| matcher.matches(&haystack, k));

        let secondary = match self.secondary {
            SecondaryKeywordMode::Ignore => true,
            SecondaryKeywordMode::RequireAny => {
                rule.secondary_keywords.is_empty()
                    || rule
                        .secondary_keywords
                        .iter()
                        .any(|k| matcher.matches(&haystack, k))
            }
        };

        trace!(rule = %rule.id, logic = %rule.logic, primary, secondary, "trigger evaluated");
        primary && secondary
    }
}
