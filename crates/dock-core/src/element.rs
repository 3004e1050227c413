//! # Element String Parser
//!
//! Tokenizes a raw GS1-128 scan into an AI → value mapping.
//!
//! ## Tokenization Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Element String Tokenization                          │
//! │                                                                         │
//! │  raw: "]C1(01)12345678901231(10)ABC123"                                │
//! │       │                                                                 │
//! │       ▼  pre-process                                                   │
//! │  trim, drop AIM prefix "]C1", "(" → <GS>, drop ")"                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  "0112345678901231<GS>10ABC123"                                        │
//! │       │                                                                 │
//! │       ▼  loop                                                          │
//! │  ┌─────────────────────────────────────────────────────┐               │
//! │  │ skip <GS> at AI boundary                            │               │
//! │  │ try 2, 3, 4 chars as AI ── none? ──► stop (keep)    │               │
//! │  │ fixed? take N chars ────── short? ─► stop (discard) │               │
//! │  │ variable? take until <GS> / max / end               │               │
//! │  └─────────────────────────────────────────────────────┘               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { "01": "12345678901231", "10": "ABC123" }                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parsing is a pure function of the raw text and the static rule table.

use std::collections::BTreeMap;

use crate::ai::{self, AiRule, GROUP_SEPARATOR, MAX_AI_LEN, MIN_AI_LEN};
use crate::error::ParseHalt;

// =============================================================================
// AI Values
// =============================================================================

/// The AI → value mapping recognized in one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiValues {
    values: BTreeMap<&'static str, String>,
}

impl AiValues {
    /// Returns the value recorded for an AI.
    pub fn get(&self, ai: &str) -> Option<&str> {
        self.values.get(ai).map(String::as_str)
    }

    /// Returns true if the AI was recognized.
    pub fn contains(&self, ai: &str) -> bool {
        self.values.contains_key(ai)
    }

    /// Number of recognized AIs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no AI was recognized.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over (AI, value) pairs in AI order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values.iter().map(|(ai, value)| (*ai, value.as_str()))
    }

    /// Records a value. The first occurrence of an AI wins.
    fn record(&mut self, ai: &'static str, value: String) {
        if !value.is_empty() {
            self.values.entry(ai).or_insert(value);
        }
    }
}

// =============================================================================
// Tokenized Result
// =============================================================================

/// Result of a full tokenization pass, including why it stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    /// AIs collected before the end of input or the halt.
    pub values: AiValues,

    /// Set when tokenization stopped before consuming all input.
    pub halt: Option<ParseHalt>,
}

// =============================================================================
// Element String
// =============================================================================

/// A scanned element string plus its parse cursor.
///
/// Lives only for the duration of one parse call.
#[derive(Debug, Clone)]
pub struct ElementString {
    chars: Vec<char>,
    cursor: usize,
}

impl ElementString {
    /// Prepares raw scan text for tokenization.
    ///
    /// ## Pre-processing
    /// - Surrounding whitespace is trimmed
    /// - A leading AIM symbology identifier (`]C1`, `]d2`, `]Q3`, ...) is dropped
    /// - Brackets are removed; a `(` opening a later AI becomes a separator so
    ///   bracketed variable-length values stay delimited
    pub fn new(raw: &str) -> Self {
        let trimmed = strip_symbology_id(raw.trim());

        let mut chars = Vec::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            match c {
                '(' if !chars.is_empty() => chars.push(GROUP_SEPARATOR),
                '(' | ')' => {}
                other => chars.push(other),
            }
        }

        ElementString { chars, cursor: 0 }
    }

    /// Characters left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.chars.len() - self.cursor
    }

    /// Runs the tokenizer to completion.
    pub fn tokenize(mut self) -> Tokenized {
        let mut values = AiValues::default();

        let halt = loop {
            self.skip_separators();
            if self.remaining() == 0 {
                break None;
            }

            let position = self.cursor;
            let Some(rule) = self.next_ai() else {
                break Some(ParseHalt::UnknownAi { position });
            };

            match rule.fixed_length {
                Some(len) => match self.take_fixed(rule, len) {
                    Ok(value) => values.record(rule.ai, value),
                    Err(halt) => break Some(halt),
                },
                None => {
                    let max = rule.max_length.unwrap_or(usize::MAX);
                    let value = self.take_variable(max);
                    values.record(rule.ai, value);
                }
            }
        };

        Tokenized { values, halt }
    }

    fn skip_separators(&mut self) {
        while self.cursor < self.chars.len() && self.chars[self.cursor] == GROUP_SEPARATOR {
            self.cursor += 1;
        }
    }

    /// Matches the shortest known AI at the cursor and consumes it.
    fn next_ai(&mut self) -> Option<&'static AiRule> {
        for len in MIN_AI_LEN..=MAX_AI_LEN {
            if len > self.remaining() {
                return None;
            }
            let code: String = self.chars[self.cursor..self.cursor + len].iter().collect();
            if let Some(rule) = ai::lookup(&code) {
                self.cursor += len;
                return Some(rule);
            }
        }
        None
    }

    fn take_fixed(&mut self, rule: &'static AiRule, len: usize) -> Result<String, ParseHalt> {
        if self.remaining() < len {
            return Err(ParseHalt::Truncated {
                ai: rule.ai,
                needed: len,
                available: self.remaining(),
            });
        }

        let window = &self.chars[self.cursor..self.cursor + len];
        if window.contains(&GROUP_SEPARATOR) {
            return Err(ParseHalt::SeparatorInFixedField { ai: rule.ai });
        }

        self.cursor += len;
        Ok(window.iter().collect())
    }

    fn take_variable(&mut self, max: usize) -> String {
        let start = self.cursor;
        while self.cursor < self.chars.len()
            && self.chars[self.cursor] != GROUP_SEPARATOR
            && self.cursor - start < max
        {
            self.cursor += 1;
        }
        let value: String = self.chars[start..self.cursor].iter().collect();

        // The terminating separator belongs to this field
        if self.cursor < self.chars.len() && self.chars[self.cursor] == GROUP_SEPARATOR {
            self.cursor += 1;
        }

        value
    }
}

/// Drops a leading AIM symbology identifier: `]`, one letter, one digit.
fn strip_symbology_id(s: &str) -> &str {
    let mut chars = s.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(']'), Some(letter), Some(digit))
            if letter.is_ascii_alphabetic() && digit.is_ascii_digit() =>
        {
            &s[3..]
        }
        _ => s,
    }
}

// =============================================================================
// Public Entry Point
// =============================================================================

/// Parses a raw scan into its AI → value mapping.
///
/// Returns `None` only when no AI could be recognized at all. A trailing
/// unparseable remainder or a truncated final AI is not an error: the AIs
/// collected before it are returned.
///
/// ## Example
/// ```rust
/// use dock_core::element::parse;
///
/// let values = parse("01123456789012311719012310ABC123").unwrap();
/// assert_eq!(values.get("01"), Some("12345678901231"));
/// assert_eq!(values.get("17"), Some("190123"));
/// assert_eq!(values.get("10"), Some("ABC123"));
///
/// assert!(parse("hello").is_none());
/// ```
pub fn parse(raw: &str) -> Option<AiValues> {
    let tokenized = ElementString::new(raw).tokenize();
    if tokenized.values.is_empty() {
        None
    } else {
        Some(tokenized.values)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
