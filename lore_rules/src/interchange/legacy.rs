//! Lenient rule records used when importing older or partial data.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::keywords::parse_keywords;
use crate::rule::{Rule, RuleId, TriggerLogic, DEFAULT_CATEGORY};

/// A keyword field as found in the wild: either a list or one free-text line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeywordField {
    List(Vec<String>),
    Text(String),
}

impl KeywordField {
    /// Turn the field into tokens. Free text goes through the keyword parser;
    /// lists are kept verbatim so validation can report bad entries.
    pub fn into_tokens(self) -> Vec<String> {
        match self {
            KeywordField::List(tokens) => tokens,
            KeywordField::Text(raw) => parse_keywords(&raw),
        }
    }
}

impl Default for KeywordField {
    fn default() -> Self {
        KeywordField::List(Vec::new())
    }
}

/// Creation time as either RFC 3339 text or epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyTimestamp {
    Rfc3339(DateTime<Utc>),
    EpochMillis(i64),
}

impl LegacyTimestamp {
    fn to_datetime(self) -> Option<DateTime<Utc>> {
        match self {
            LegacyTimestamp::Rfc3339(at) => Some(at),
            LegacyTimestamp::EpochMillis(ms) => DateTime::from_timestamp_millis(ms),
        }
    }
}

/// A rule id as found in the wild: UUID text, another string, or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Text(String),
    Number(serde_json::Number),
}

impl LegacyId {
    /// The id as a UUID, if it is one.
    fn to_rule_id(&self) -> Option<RuleId> {
        match self {
            LegacyId::Text(raw) => Uuid::parse_str(raw).ok().map(RuleId),
            LegacyId::Number(_) => None,
        }
    }
}

impl std::fmt::Display for LegacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegacyId::Text(raw) => f.write_str(raw),
            LegacyId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A rule where every field is optional.
///
/// Missing fields take the same defaults as [`Rule::new`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyRule {
    pub id: Option<LegacyId>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub keywords: Option<KeywordField>,
    pub secondary_keywords: Option<KeywordField>,
    pub logic: Option<TriggerLogic>,
    pub always_active: Option<bool>,
    pub order: Option<i32>,
    pub probability: Option<i32>,
    pub max_activations_per_turn: Option<i32>,
    pub scan_depth: Option<i32>,
    pub scan_player_input: Option<bool>,
    #[serde(rename = "scanAIOutput")]
    pub scan_ai_output: Option<bool>,
    pub scan_memories: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub match_whole_words: Option<bool>,
    pub token_priority: Option<i32>,
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub created_at: Option<LegacyTimestamp>,
    pub activation_count: Option<u64>,
    pub last_activated: Option<u64>,
}

impl LegacyRule {
    /// Fill in defaults and produce a full rule.
    ///
    /// Any stored token weight is discarded and recomputed from the content.
    /// IDs that are not UUIDs are replaced with fresh ones.
    pub fn migrate(self) -> Rule {
        let mut rule = Rule::new(
            self.title.unwrap_or_default(),
            self.content.unwrap_or_default(),
        );

        if let Some(raw) = self.id {
            match raw.to_rule_id() {
                Some(id) => rule.id = id,
                None => debug!(legacy_id = %raw, new_id = %rule.id, "replacing non-UUID rule id"),
            }
        }

        rule.keywords = self.keywords.unwrap_or_default().into_tokens();
        rule.secondary_keywords = self.secondary_keywords.unwrap_or_default().into_tokens();
        rule.logic = self.logic.unwrap_or(rule.logic);
        rule.always_active = self.always_active.unwrap_or(rule.always_active);
        rule.order = self.order.unwrap_or(rule.order);
        rule.probability = self.probability.unwrap_or(rule.probability);
        rule.max_activations_per_turn = self.max_activations_per_turn;
        rule.scan_depth = self.scan_depth.unwrap_or(rule.scan_depth);
        rule.scan_player_input = self.scan_player_input.unwrap_or(rule.scan_player_input);
        rule.scan_ai_output = self.scan_ai_output.unwrap_or(rule.scan_ai_output);
        rule.scan_memories = self.scan_memories.unwrap_or(rule.scan_memories);
        rule.case_sensitive = self.case_sensitive.unwrap_or(rule.case_sensitive);
        rule.match_whole_words = self.match_whole_words.unwrap_or(rule.match_whole_words);
        rule.token_priority = self.token_priority.unwrap_or(rule.token_priority);
        rule.is_active = self.is_active.unwrap_or(rule.is_active);
        rule.category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        if let Some(at) = self.created_at.and_then(LegacyTimestamp::to_datetime) {
            rule.created_at = at;
        }
        rule.activation_count = self.activation_count.unwrap_or(0);
        rule.last_activated = self.last_activated;

        rule.refresh_token_weight();
        rule
    }
}
