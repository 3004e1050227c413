//! # Application Identifier Rules
//!
//! Static metadata describing how each supported GS1 Application Identifier
//! (AI) encodes its value.
//!
//! ## Encoding Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      AI Value Encodings                                 │
//! │                                                                         │
//! │  FIXED LENGTH                                                          │
//! │  ────────────                                                          │
//! │  01 12345678901231 17 190123                                           │
//! │  ^^ ^^^^^^^^^^^^^^ ^^ ^^^^^^                                           │
//! │  AI  exactly 14    AI  exactly 6    → self-delimiting, no separator    │
//! │                                                                         │
//! │  VARIABLE LENGTH                                                       │
//! │  ───────────────                                                       │
//! │  10 ABC123 <GS> 37 24                                                  │
//! │  ^^ ^^^^^^ ^^^^ ^^ ^^                                                  │
//! │  AI ≤ 20   FNC1 AI ≤ 8    → ends at separator, max length or end       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! AI codes are 2 to 4 digits. No 2-digit code in the table is a prefix of a
//! longer one, so the shortest matching prefix is always the right one.

// =============================================================================
// Constants
// =============================================================================

/// FNC1 as transmitted by scanners: ASCII Group Separator.
pub const GROUP_SEPARATOR: char = '\u{1d}';

/// Serial Shipping Container Code.
pub const SSCC: &str = "00";
/// Global Trade Item Number of the scanned item.
pub const GTIN: &str = "01";
/// GTIN of the trade items contained in a logistic unit.
pub const CONTENT: &str = "02";
/// Batch or lot number.
pub const BATCH_LOT: &str = "10";
/// Best before date (YYMMDD).
pub const BEST_BEFORE: &str = "15";
/// Expiration date (YYMMDD).
pub const EXPIRY: &str = "17";
/// Variable count of items.
pub const VAR_COUNT: &str = "30";
/// Count of trade items contained in a logistic unit.
pub const COUNT: &str = "37";

/// Shortest AI code length.
pub const MIN_AI_LEN: usize = 2;
/// Longest AI code length.
pub const MAX_AI_LEN: usize = 4;

// =============================================================================
// AI Rule
// =============================================================================

/// Encoding rule for one Application Identifier.
///
/// Exactly one of `fixed_length` / `max_length` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiRule {
    /// The AI code, 2 to 4 digits.
    pub ai: &'static str,

    /// Value length for fixed-length AIs.
    pub fixed_length: Option<usize>,

    /// Maximum value length for variable-length AIs.
    pub max_length: Option<usize>,

    /// GS1 data title, for diagnostics.
    pub title: &'static str,
}

impl AiRule {
    const fn fixed(ai: &'static str, len: usize, title: &'static str) -> Self {
        AiRule {
            ai,
            fixed_length: Some(len),
            max_length: None,
            title,
        }
    }

    const fn variable(ai: &'static str, max: usize, title: &'static str) -> Self {
        AiRule {
            ai,
            fixed_length: None,
            max_length: Some(max),
            title,
        }
    }

    /// Returns true if the value has a fixed length.
    #[inline]
    pub const fn is_fixed(&self) -> bool {
        self.fixed_length.is_some()
    }
}

// =============================================================================
// Rule Table
// =============================================================================

static AI_RULES: &[AiRule] = &[
    AiRule::fixed(SSCC, 18, "SSCC"),
    AiRule::fixed(GTIN, 14, "GTIN"),
    AiRule::fixed(CONTENT, 14, "CONTENT"),
    AiRule::variable(BATCH_LOT, 20, "BATCH/LOT"),
    AiRule::fixed("11", 6, "PROD DATE"),
    AiRule::fixed("12", 6, "DUE DATE"),
    AiRule::fixed("13", 6, "PACK DATE"),
    AiRule::fixed(BEST_BEFORE, 6, "BEST BEFORE or BEST BY"),
    AiRule::fixed("16", 6, "SELL BY"),
    AiRule::fixed(EXPIRY, 6, "USE BY or EXPIRY"),
    AiRule::fixed("20", 2, "VARIANT"),
    AiRule::variable("21", 20, "SERIAL"),
    AiRule::variable("22", 20, "CPV"),
    AiRule::variable(VAR_COUNT, 8, "VAR. COUNT"),
    AiRule::variable(COUNT, 8, "COUNT"),
    AiRule::variable("240", 30, "ADDITIONAL ID"),
    AiRule::variable("241", 30, "CUST. PART No."),
    AiRule::variable("400", 30, "ORDER NUMBER"),
    AiRule::fixed("410", 13, "SHIP TO LOC"),
    AiRule::fixed("414", 13, "LOC No."),
    AiRule::fixed("7003", 10, "EXPIRY TIME"),
    AiRule::variable("8020", 25, "REF No."),
];

/// Returns every known rule.
pub fn rules() -> &'static [AiRule] {
    AI_RULES
}

/// Looks up the rule for an AI code.
///
/// ## Example
/// ```rust
/// use dock_core::ai;
///
/// let rule = ai::lookup("01").unwrap();
/// assert_eq!(rule.fixed_length, Some(14));
/// assert!(ai::lookup("99").is_none());
/// ```
pub fn lookup(code: &str) -> Option<&'static AiRule> {
    AI_RULES.iter().find(|rule| rule.ai == code)
}

// =============================================================================
// Unit Tests
// =============================================================================
