//! Import and export of rule collections.
//!
//! Two JSON shapes are accepted on import:
//! - a bare array of legacy rules, where any field may be missing
//! - a versioned export document `{version, exportedAt, rulesCount, rules}`
//!
//! Each rule is migrated and validated on its own: a bad rule is reported and
//! skipped while the rest still import. Only malformed JSON or an unknown
//! document shape aborts the whole import.

mod legacy;
mod world_info;

pub use legacy::*;
pub use world_info::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{RuleError, RuleResult};
use crate::rule::{Rule, RuleId};
use crate::store::RuleStore;

/// Version written into export documents.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// The versioned export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub rules_count: usize,
    pub rules: Vec<Rule>,
}

impl ExportDocument {
    /// Capture every rule in the store.
    pub fn from_store(store: &RuleStore) -> Self {
        let rules: Vec<Rule> = store.iter().cloned().collect();
        Self {
            version: EXPORT_FORMAT_VERSION,
            exported_at: Utc::now(),
            rules_count: rules.len(),
            rules,
        }
    }
}

/// Outcome of an import: which rules made it in, and what went wrong with
/// the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<RuleId>,
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Whether every entry imported cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn reject(&mut self, label: String, error: impl std::fmt::Display) {
        let message = format!("{label}: {error}");
        warn!(%message, "skipping rule during import");
        self.errors.push(message);
    }
}

impl RuleStore {
    /// Serialize every rule as a versioned export document.
    pub fn export_json(&self) -> RuleResult<String> {
        Ok(serde_json::to_string_pretty(&ExportDocument::from_store(self))?)
    }

    /// Import rules from a legacy array or a versioned export document.
    pub fn import_json(&mut self, json: &str) -> RuleResult<ImportReport> {
        let document: Value = serde_json::from_str(json)?;

        let entries = match document {
            Value::Array(entries) => entries,
            Value::Object(mut object) => match object.remove("rules") {
                Some(Value::Array(entries)) => entries,
                Some(_) => {
                    return Err(RuleError::Unsupported(
                        "\"rules\" must be an array".to_string(),
                    ))
                }
                None => {
                    return Err(RuleError::Unsupported(
                        "expected a rule array or an object with \"rules\"".to_string(),
                    ))
                }
            },
            _ => {
                return Err(RuleError::Unsupported(
                    "expected a rule array or an object with \"rules\"".to_string(),
                ))
            }
        };

        let mut report = ImportReport::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let label = format!("rule #{index}");

            let legacy: LegacyRule = match serde_json::from_value(entry) {
                Ok(legacy) => legacy,
                Err(e) => {
                    report.reject(label, e);
                    continue;
                }
            };

            match self.add(legacy.migrate()) {
                Ok(id) => report.imported.push(id),
                Err(e) => report.reject(label, e),
            }
        }

        info!(
            imported = report.imported.len(),
            rejected = report.errors.len(),
            "rule import finished"
        );
        Ok(report)
    }
}
