//! Keyword field parsing - turns free-text keyword fields into tokens.
//!
//! Authors type keywords the way they would in a chat box:
//!
//! ```text
//! red dragon, "ancient, cursed sword"; [the old king]
//! ```
//!
//! The parser is a single left-to-right scan with three states:
//! 1. **Normal**: `,` and `;` separate tokens, whitespace is context-sensitive
//! 2. **Quoted**: everything up to the matching quote is one token
//! 3. **Bracketed**: everything up to `]` is one token
//!
//! A single space between words is kept, so `red dragon, sword` yields the
//! phrase `red dragon`. A run of two or more whitespace characters, a newline,
//! or whitespace right before a separator or the end of input splits tokens.

/// Maximum number of tokens kept from a single keyword field.
pub const MAX_KEYWORDS: usize = 20;

/// Maximum length of a single token, in characters.
pub const MAX_KEYWORD_CHARS: usize = 100;

const QUOTES: [char; 3] = ['"', '\'', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InQuote(char),
    InBracket,
}

/// Parse a raw keyword field into an ordered list of tokens.
///
/// Never fails: malformed input (unclosed quotes or brackets, stray
/// separators) degrades to whatever tokens can be recovered, possibly none.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut state = ScanState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        match state {
            ScanState::InQuote(open) => {
                if c == open {
                    flush(&mut buffer, &mut tokens);
                    state = ScanState::Normal;
                } else {
                    buffer.push(c);
                }
            }
            ScanState::InBracket => {
                if c == ']' {
                    flush(&mut buffer, &mut tokens);
                    state = ScanState::Normal;
                } else {
                    buffer.push(c);
                }
            }
            ScanState::Normal => {
                if QUOTES.contains(&c) && !is_inner_apostrophe(&chars, i) {
                    flush(&mut buffer, &mut tokens);
                    state = ScanState::InQuote(c);
                } else if c == '[' {
                    flush(&mut buffer, &mut tokens);
                    state = ScanState::InBracket;
                } else if is_separator(c) {
                    flush(&mut buffer, &mut tokens);
                } else if c.is_whitespace() {
                    let run_end = chars[i..]
                        .iter()
                        .position(|ch| !ch.is_whitespace())
                        .map_or(chars.len(), |offset| i + offset);

                    if splits_tokens(&chars, i, run_end) {
                        flush(&mut buffer, &mut tokens);
                    } else if !buffer.is_empty() {
                        buffer.push(c);
                    }

                    i = run_end;
                    continue;
                } else {
                    buffer.push(c);
                }
            }
        }

        i += 1;
    }

    flush(&mut buffer, &mut tokens);
    tidy(tokens)
}

/// Format tokens back into an editable field.
///
/// Tokens containing whitespace or parser-significant characters are wrapped
/// in a quote character they do not themselves contain, so that
/// `parse_keywords(&format_keywords(&tokens)) == tokens` for well-formed lists.
pub fn format_keywords<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| quote_if_needed(token.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_if_needed(token: &str) -> String {
    let needs_quotes = token
        .chars()
        .any(|c| c.is_whitespace() || is_separator(c) || QUOTES.contains(&c) || c == '[' || c == ']');

    if !needs_quotes {
        return token.to_string();
    }

    match QUOTES.iter().find(|quote| !token.contains(**quote)) {
        Some(quote) => format!("{quote}{token}{quote}"),
        None => token.to_string(),
    }
}

fn is_separator(c: char) -> bool {
    c == ',' || c == ';'
}

/// Whether the whitespace run `chars[start..end]` acts as a token separator.
fn splits_tokens(chars: &[char], start: usize, end: usize) -> bool {
    let run = &chars[start..end];
    run.len() >= 2
        || run.iter().any(|c| *c == '\n' || *c == '\r')
        || end == chars.len()
        || is_separator(chars[end])
}

/// Apostrophes inside a word (`dragon's`) are literal, not quote openers.
fn is_inner_apostrophe(chars: &[char], i: usize) -> bool {
    chars[i] == '\''
        && i > 0
        && chars[i - 1].is_alphanumeric()
        && chars.get(i + 1).is_some_and(|c| c.is_alphanumeric())
}

fn flush(buffer: &mut String, tokens: &mut Vec<String>) {
    if !buffer.is_empty() {
        tokens.push(std::mem::take(buffer));
    }
}

fn tidy(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .filter(|token| token.chars().count() <= MAX_KEYWORD_CHARS)
        .take(MAX_KEYWORDS)
        .collect()
}
