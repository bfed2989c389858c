//! Scan sources - the recent text a rule's keywords are matched against.

use serde::{Deserialize, Serialize};

use lore_rules::Rule;

/// Recent interaction text supplied by the game-state manager for one turn.
///
/// Histories are ordered oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSources {
    /// The player's input for the current turn.
    pub player_input: String,

    /// Past narration outputs.
    pub narration: Vec<String>,

    /// Memory notes.
    pub memories: Vec<String>,
}

impl ScanSources {
    /// Create scan sources holding only the current player input.
    pub fn new(player_input: impl Into<String>) -> Self {
        Self {
            player_input: player_input.into(),
            ..Self::default()
        }
    }

    /// Set the narration history.
    pub fn with_narration<I, S>(mut self, narration: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.narration = narration.into_iter().map(Into::into).collect();
        self
    }

    /// Set the memory notes.
    pub fn with_memories<I, S>(mut self, memories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memories = memories.into_iter().map(Into::into).collect();
        self
    }

    /// Concatenate the text visible through a scan window.
    ///
    /// Each enabled source contributes its own most recent `depth` entries,
    /// oldest first: narration, then memories, then the player input.
    pub fn scan_text(&self, window: &ScanWindow) -> String {
        let mut parts: Vec<&str> = Vec::new();

        if window.ai_output {
            parts.extend(recent(&self.narration, window.depth).iter().map(String::as_str));
        }
        if window.memories {
            parts.extend(recent(&self.memories, window.depth).iter().map(String::as_str));
        }
        if window.player_input && window.depth > 0 && !self.player_input.is_empty() {
            parts.push(&self.player_input);
        }

        parts.join("\n")
    }
}

/// Which sources a rule reads, and how far back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanWindow {
    pub depth: usize,
    pub player_input: bool,
    pub ai_output: bool,
    pub memories: bool,
}

impl ScanWindow {
    /// The window configured on a rule.
    pub fn for_rule(rule: &Rule) -> Self {
        Self {
            depth: usize::try_from(rule.scan_depth).unwrap_or(0),
            player_input: rule.scan_player_input,
            ai_output: rule.scan_ai_output,
            memories: rule.scan_memories,
        }
    }
}

fn recent(entries: &[String], depth: usize) -> &[String] {
    &entries[entries.len().saturating_sub(depth)..]
}
