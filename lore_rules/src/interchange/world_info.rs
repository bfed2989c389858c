//! WorldInfo lorebook import.
//!
//! Lorebooks store entries under `entries`, either as an object keyed by
//! numeric strings or as a plain array. Each entry is mapped onto a [`Rule`]
//! by a pure function; the store only sees entries that mapped and validated.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{ImportReport, KeywordField};
use crate::error::{RuleError, RuleResult};
use crate::rule::{Rule, TriggerLogic};
use crate::store::RuleStore;

/// A lorebook document.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldInfoBook {
    #[serde(default)]
    pub name: Option<String>,
    pub entries: WorldInfoEntries,
}

/// Lorebook entries, keyed or listed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorldInfoEntries {
    Keyed(serde_json::Map<String, Value>),
    Listed(Vec<Value>),
}

impl WorldInfoEntries {
    /// Entries with a display label, keyed entries in numeric key order.
    fn into_labelled(self) -> Vec<(String, Value)> {
        match self {
            WorldInfoEntries::Keyed(map) => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by_key(|(key, _)| (key.parse::<u64>().unwrap_or(u64::MAX), key.clone()));
                entries
                    .into_iter()
                    .map(|(key, value)| (format!("entry {key}"), value))
                    .collect()
            }
            WorldInfoEntries::Listed(list) => list
                .into_iter()
                .enumerate()
                .map(|(index, value)| (format!("entry #{index}"), value))
                .collect(),
        }
    }
}

/// One lorebook entry. Only the fields that carry over are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldInfoEntry {
    pub uid: Option<i64>,
    pub key: Option<KeywordField>,
    pub keysecondary: Option<KeywordField>,
    pub comment: Option<String>,
    pub content: Option<String>,
    pub constant: Option<bool>,
    pub selective_logic: Option<i64>,
    pub order: Option<i32>,
    pub probability: Option<i32>,
    pub use_probability: Option<bool>,
    pub depth: Option<i32>,
    pub case_sensitive: Option<bool>,
    pub match_whole_words: Option<bool>,
    pub disable: Option<bool>,
    pub group: Option<String>,
}

/// Map a `selectiveLogic` code onto a trigger mode.
pub fn logic_from_code(code: i64) -> Option<TriggerLogic> {
    match code {
        0 => Some(TriggerLogic::Any),
        1 => Some(TriggerLogic::NotAll),
        2 => Some(TriggerLogic::NotAny),
        3 => Some(TriggerLogic::All),
        _ => None,
    }
}

/// Convert a lorebook entry into a validated rule.
///
/// Constant entries become always-active rules and lose their keys. When
/// `useProbability` is explicitly off the entry always fires once matched.
pub fn map_world_info_entry(entry: WorldInfoEntry) -> RuleResult<Rule> {
    let mut rule = Rule::new(
        entry.comment.unwrap_or_default(),
        entry.content.unwrap_or_default(),
    );

    if let Some(code) = entry.selective_logic {
        rule.logic = logic_from_code(code)
            .ok_or_else(|| RuleError::Unsupported(format!("unknown selectiveLogic code {code}")))?;
    }

    rule.always_active = entry.constant.unwrap_or(false);
    if !rule.always_active {
        rule.keywords = entry.key.unwrap_or_default().into_tokens();
        rule.secondary_keywords = entry.keysecondary.unwrap_or_default().into_tokens();
    }

    rule.order = entry.order.unwrap_or(rule.order);
    rule.probability = match entry.use_probability {
        Some(false) => 100,
        _ => entry.probability.unwrap_or(rule.probability),
    };
    rule.scan_depth = entry.depth.unwrap_or(rule.scan_depth);
    rule.case_sensitive = entry.case_sensitive.unwrap_or(rule.case_sensitive);
    rule.match_whole_words = entry.match_whole_words.unwrap_or(rule.match_whole_words);
    rule.is_active = !entry.disable.unwrap_or(false);
    if let Some(group) = entry.group.filter(|g| !g.trim().is_empty()) {
        rule.category = group;
    }

    rule.validate()?;
    Ok(rule)
}

impl RuleStore {
    /// Import every entry of a lorebook.
    pub fn import_world_info(&mut self, json: &str) -> RuleResult<ImportReport> {
        let book: WorldInfoBook = serde_json::from_str(json)?;
        let mut report = ImportReport::default();

        for (label, value) in book.entries.into_labelled() {
            let mapped = serde_json::from_value::<WorldInfoEntry>(value)
                .map_err(RuleError::from)
                .and_then(map_world_info_entry)
                .and_then(|rule| self.add(rule));

            match mapped {
                Ok(id) => report.imported.push(id),
                Err(e) => report.reject(label, e),
            }
        }

        info!(
            book = book.name.as_deref().unwrap_or("unnamed"),
            imported = report.imported.len(),
            rejected = report.errors.len(),
            "lorebook import finished"
        );
        Ok(report)
    }
}
