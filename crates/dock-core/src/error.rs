//! # Error Types
//!
//! Diagnostic error types for dock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dock-core errors (this file)                                          │
//! │  ├── ParseHalt      - Why element string tokenization stopped          │
//! │  ├── GtinError      - Why a bare numeric code is not a GTIN            │
//! │  └── IdentifyError  - Why a scan is not a recognized identifier        │
//! │                                                                         │
//! │  dock-scan errors (separate crate)                                     │
//! │  ├── ScanError      - Lifecycle, config, choice bookkeeping            │
//! │  └── ResolverError  - Faults raised by the inventory resolver          │
//! │                                                                         │
//! │  Flow: ParseHalt / GtinError → IdentifyError → debug log → release     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. These errors are *diagnostics*: the public facade returns `Option`,
//!    the `Result` twins exist so callers can log the reason
//! 3. An unrecognized scan is an expected outcome, never a failure

use thiserror::Error;

// =============================================================================
// Element String Halts
// =============================================================================

/// Why tokenization of an element string stopped before the end of input.
///
/// A halt is not fatal: whatever AIs were collected before the halt are still
/// returned. The partially read AI that caused the halt is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHalt {
    /// The next 2, 3 and 4 characters are not a known Application Identifier.
    #[error("unknown application identifier at position {position}")]
    UnknownAi { position: usize },

    /// A fixed-length AI ran out of input before its value was complete.
    ///
    /// ## Example
    /// ```text
    /// "01" + "1234567"      GTIN needs 14 characters, only 7 remain
    ///  ^^    ^^^^^^^
    ///  AI    truncated value → AI (01) is discarded
    /// ```
    #[error("AI ({ai}) needs {needed} characters, only {available} remain")]
    Truncated {
        ai: &'static str,
        needed: usize,
        available: usize,
    },

    /// A field separator appeared inside a fixed-length value.
    #[error("field separator inside fixed-length AI ({ai})")]
    SeparatorInFixedField { ai: &'static str },
}

// =============================================================================
// GTIN Errors
// =============================================================================

/// Reasons a bare numeric code is rejected as a GTIN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GtinError {
    /// Input was empty after trimming.
    #[error("GTIN is empty")]
    Empty,

    /// Input contains something other than ASCII digits.
    #[error("GTIN must contain only digits")]
    NonDigit,

    /// Only GTIN-12, GTIN-13 and GTIN-14 are accepted.
    #[error("GTIN must be 12, 13 or 14 digits, got {0}")]
    InvalidLength(usize),

    /// Supplied check digit disagrees with the computed one.
    #[error("GTIN check digit mismatch: expected {expected}, found {found}")]
    CheckDigitMismatch { expected: u8, found: u8 },
}

// =============================================================================
// Identify Error
// =============================================================================

/// Why a raw scan did not normalize into a set of identifiers.
///
/// ## Taxonomy
/// ```text
/// ┌───────────────────┬────────────────────────────────────────────────────┐
/// │ NotRecognized     │ Neither an element string with a product AI nor a  │
/// │                   │ valid bare GTIN. Released to default handling.     │
/// ├───────────────────┼────────────────────────────────────────────────────┤
/// │ AmbiguousInput    │ Element string broke off mid-parse and the bare    │
/// │                   │ GTIN path failed too. Treated as NotRecognized,    │
/// │                   │ never partially applied.                           │
/// └───────────────────┴────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifyError {
    /// The scan is not an identifier this system understands.
    #[error("not a recognized identifier: {reason}")]
    NotRecognized { reason: String },

    /// The element string halted mid-parse before a product AI was found.
    #[error("malformed element string: {0}")]
    AmbiguousInput(ParseHalt),
}

impl IdentifyError {
    /// Returns true if the input looked like an element string but was malformed.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, IdentifyError::AmbiguousInput(_))
    }
}

impl From<GtinError> for IdentifyError {
    fn from(err: GtinError) -> Self {
        IdentifyError::NotRecognized {
            reason: err.to_string(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for GTIN validation.
pub type GtinResult<T> = Result<T, GtinError>;

/// Result type for identifier normalization.
pub type IdentifyResult<T> = Result<T, IdentifyError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_messages() {
        let halt = ParseHalt::Truncated {
            ai: "01",
            needed: 14,
            available: 7,
        };
        assert_eq!(
            halt.to_string(),
            "AI (01) needs 14 characters, only 7 remain"
        );

        let halt = ParseHalt::UnknownAi { position: 16 };
        assert_eq!(
            halt.to_string(),
            "unknown application identifier at position 16"
        );
    }

    #[test]
    fn test_gtin_error_messages() {
        assert_eq!(
            GtinError::InvalidLength(9).to_string(),
            "GTIN must be 12, 13 or 14 digits, got 9"
        );
        assert_eq!(
            GtinError::CheckDigitMismatch {
                expected: 5,
                found: 4
            }
            .to_string(),
            "GTIN check digit mismatch: expected 5, found 4"
        );
    }

    #[test]
    fn test_gtin_error_converts_to_not_recognized() {
        let err: IdentifyError = GtinError::NonDigit.into();
        assert!(matches!(err, IdentifyError::NotRecognized { .. }));
        assert!(!err.is_ambiguous());

        let err = IdentifyError::AmbiguousInput(ParseHalt::SeparatorInFixedField { ai: "17" });
        assert!(err.is_ambiguous());
    }
}
