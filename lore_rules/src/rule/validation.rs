//! Rule validation - collects every problem instead of stopping at the first.

use super::Rule;
use crate::error::{RuleError, RuleResult};
use crate::keywords::{MAX_KEYWORDS, MAX_KEYWORD_CHARS};

impl Rule {
    /// List every validation problem with this rule as human-readable messages.
    ///
    /// An empty list means the rule is valid. The rule is never modified.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.content.trim().is_empty() {
            errors.push("content must not be empty".to_string());
        }

        check_keywords("keywords", &self.keywords, &mut errors);
        check_keywords("secondaryKeywords", &self.secondary_keywords, &mut errors);

        if !(0..=100).contains(&self.probability) {
            errors.push(format!(
                "probability must be in [0, 100], got {}",
                self.probability
            ));
        }
        if self.order < 0 {
            errors.push(format!("order must be >= 0, got {}", self.order));
        }
        if let Some(max) = self.max_activations_per_turn {
            if max < 1 {
                errors.push(format!("maxActivationsPerTurn must be >= 1, got {max}"));
            }
        }
        if self.scan_depth < 1 {
            errors.push(format!("scanDepth must be >= 1, got {}", self.scan_depth));
        }
        if self.always_active
            && (!self.keywords.is_empty() || !self.secondary_keywords.is_empty())
        {
            errors.push("always-active rules must not carry keywords".to_string());
        }

        errors
    }

    /// Whether the rule passes validation.
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }

    /// Validate the rule, returning all problems as one error.
    pub fn validate(&self) -> RuleResult<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RuleError::Invalid {
                id: self.id,
                errors,
            })
        }
    }
}

fn check_keywords(field: &str, keywords: &[String], errors: &mut Vec<String>) {
    if keywords.len() > MAX_KEYWORDS {
        errors.push(format!(
            "{field} has {} entries, at most {MAX_KEYWORDS} allowed",
            keywords.len()
        ));
    }

    for (index, keyword) in keywords.iter().enumerate() {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            errors.push(format!("{field}[{index}] is empty"));
        } else if trimmed.chars().count() > MAX_KEYWORD_CHARS {
            errors.push(format!(
                "{field}[{index}] is longer than {MAX_KEYWORD_CHARS} characters"
            ));
        }
    }
}
