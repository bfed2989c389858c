//! Rule definitions - author-supplied units of injectable knowledge.

mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keywords::format_keywords;

/// Default priority for new rules.
pub const DEFAULT_ORDER: i32 = 100;

/// Default secondary sort key for new rules.
pub const DEFAULT_TOKEN_PRIORITY: i32 = 100;

/// Default activation chance, in percent.
pub const DEFAULT_PROBABILITY: i32 = 100;

/// Default number of recent entries scanned per source.
pub const DEFAULT_SCAN_DEPTH: i32 = 3;

/// Category given to rules that were never classified.
pub const DEFAULT_CATEGORY: &str = "general";

/// Characters counted as one token when estimating content cost.
pub const CHARS_PER_TOKEN: usize = 4;

/// Unique identifier for rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    /// Create a new random rule ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil/empty rule ID.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a rule's primary keywords combine into a trigger decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerLogic {
    /// At least one keyword appears.
    #[default]
    Any,
    /// Every keyword appears.
    All,
    /// At least one keyword is missing.
    NotAll,
    /// No keyword appears.
    NotAny,
}

impl TriggerLogic {
    /// Wire name of the mode, as used in exported files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerLogic::Any => "ANY",
            TriggerLogic::All => "ALL",
            TriggerLogic::NotAll => "NOT_ALL",
            TriggerLogic::NotAny => "NOT_ANY",
        }
    }
}

impl std::fmt::Display for TriggerLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of injectable knowledge: lore, constraints, or world facts.
///
/// Numeric fields are signed so that out-of-range values coming from imports
/// or author edits survive long enough to be reported by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub title: String,

    /// Text appended to the narration context when the rule activates.
    pub content: String,

    /// Primary trigger tokens, evaluated under `logic`.
    pub keywords: Vec<String>,
    pub secondary_keywords: Vec<String>,
    pub logic: TriggerLogic,

    /// Bypasses matching and probability; only the budget can drop it.
    pub always_active: bool,

    /// Priority, higher sorts first.
    pub order: i32,

    /// Activation chance in percent, for triggered rules.
    pub probability: i32,

    /// Ceiling on triggered activations in a turn where this rule fires.
    pub max_activations_per_turn: Option<i32>,

    /// Number of recent entries scanned from each enabled source.
    pub scan_depth: i32,
    pub scan_player_input: bool,
    #[serde(rename = "scanAIOutput")]
    pub scan_ai_output: bool,
    pub scan_memories: bool,

    pub case_sensitive: bool,
    pub match_whole_words: bool,

    /// Estimated cost of `content` against the turn budget.
    pub token_weight: u32,

    /// Tie-break after `order`.
    pub token_priority: i32,

    /// Inactive rules are skipped as if deleted.
    pub is_active: bool,

    /// Display-only classification.
    pub category: String,

    pub created_at: DateTime<Utc>,

    pub activation_count: u64,
    pub last_activated: Option<u64>,
}

impl Rule {
    /// Create a new triggered rule with default settings.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: RuleId::new(),
            title: title.into(),
            token_weight: estimate_token_weight(&content),
            content,
            keywords: Vec::new(),
            secondary_keywords: Vec::new(),
            logic: TriggerLogic::Any,
            always_active: false,
            order: DEFAULT_ORDER,
            probability: DEFAULT_PROBABILITY,
            max_activations_per_turn: None,
            scan_depth: DEFAULT_SCAN_DEPTH,
            scan_player_input: true,
            scan_ai_output: true,
            scan_memories: false,
            case_sensitive: false,
            match_whole_words: false,
            token_priority: DEFAULT_TOKEN_PRIORITY,
            is_active: true,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: Utc::now(),
            activation_count: 0,
            last_activated: None,
        }
    }

    /// Set the rule ID.
    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = id;
        self
    }

    /// Replace the content and recompute the token weight.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.set_content(content);
        self
    }

    /// Set the primary keywords.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the secondary keywords.
    pub fn with_secondary_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the trigger logic.
    pub fn with_logic(mut self, logic: TriggerLogic) -> Self {
        self.logic = logic;
        self
    }

    /// Mark the rule as always active.
    pub fn always_active(mut self) -> Self {
        self.always_active = true;
        self
    }

    /// Set the priority.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the activation probability, in percent.
    pub fn with_probability(mut self, probability: i32) -> Self {
        self.probability = probability;
        self
    }

    /// Set the per-turn activation ceiling.
    pub fn with_max_activations_per_turn(mut self, max: i32) -> Self {
        self.max_activations_per_turn = Some(max);
        self
    }

    /// Set the scan depth.
    pub fn with_scan_depth(mut self, depth: i32) -> Self {
        self.scan_depth = depth;
        self
    }

    /// Choose which scan sources feed this rule.
    pub fn with_scan_sources(mut self, player_input: bool, ai_output: bool, memories: bool) -> Self {
        self.scan_player_input = player_input;
        self.scan_ai_output = ai_output;
        self.scan_memories = memories;
        self
    }

    /// Set case sensitivity.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set whole-word matching.
    pub fn with_match_whole_words(mut self, whole_words: bool) -> Self {
        self.match_whole_words = whole_words;
        self
    }

    /// Override the token weight.
    ///
    /// The weight is recomputed the next time the content changes.
    pub fn with_token_weight(mut self, weight: u32) -> Self {
        self.token_weight = weight;
        self
    }

    /// Set the token priority.
    pub fn with_token_priority(mut self, priority: i32) -> Self {
        self.token_priority = priority;
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set whether the rule takes part in evaluation.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Replace the content, keeping the token weight in sync.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.refresh_token_weight();
    }

    /// Recompute the token weight from the current content.
    pub fn refresh_token_weight(&mut self) {
        self.token_weight = estimate_token_weight(&self.content);
    }

    /// Record that the rule was injected on the given turn.
    pub fn record_activation(&mut self, turn: u64) {
        self.activation_count += 1;
        self.last_activated = Some(turn);
    }

    /// Primary keywords formatted for an edit field.
    pub fn keywords_display(&self) -> String {
        format_keywords(&self.keywords)
    }

    /// Secondary keywords formatted for an edit field.
    pub fn secondary_keywords_display(&self) -> String {
        format_keywords(&self.secondary_keywords)
    }
}

/// Estimate the token cost of a piece of content.
///
/// One token per [`CHARS_PER_TOKEN`] characters, rounded up.
pub fn estimate_token_weight(content: &str) -> u32 {
    let tokens = content.chars().count().div_ceil(CHARS_PER_TOKEN);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}
