//! Keyword matching against scan text.

use std::borrow::Cow;

use lore_rules::Rule;

/// Token comparison settings taken from a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeywordMatcher {
    pub case_sensitive: bool,
    pub whole_words: bool,
}

impl KeywordMatcher {
    /// The matcher configured on a rule.
    pub fn for_rule(rule: &Rule) -> Self {
        Self {
            case_sensitive: rule.case_sensitive,
            whole_words: rule.match_whole_words,
        }
    }

    /// Apply case folding unless matching is case-sensitive.
    pub fn fold<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }

    /// Check whether `keyword` occurs in `haystack`.
    ///
    /// `haystack` must already be folded with [`KeywordMatcher::fold`].
    /// Blank keywords never match.
    pub fn matches(&self, haystack: &str, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return false;
        }

        let needle = self.fold(keyword);
        if self.whole_words {
            contains_word(haystack, &needle)
        } else {
            haystack.contains(&*needle)
        }
    }
}

/// Find `needle` with no word character directly before or after it.
///
/// Candidates may overlap, so after a rejected hit the search resumes one
/// character past its start rather than past its end.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();
        let open = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_word_char(c));
        let close = haystack[end..].chars().next().is_none_or(|c| !is_word_char(c));
        if open && close {
            return true;
        }

        match haystack[start..].chars().next() {
            Some(c) => from = start + c.len_utf8(),
            None => return false,
        }
    }
    false
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
