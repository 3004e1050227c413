//! # Identifier Normalization
//!
//! One entry point turning raw scan text into a structured identifier set.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    normalize(raw)                                       │
//! │                                                                         │
//! │   raw ──► Element String Parser                                        │
//! │              │                                                          │
//! │              ├── AI (01) or (02) with 14 digits? ──► ElementString      │
//! │              │      + lot (10), expiry (17), best before (15),         │
//! │              │        quantity (37, else 30), sscc (00)                │
//! │              │                                                          │
//! │              └── nothing usable                                        │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │              strip whitespace ──► GTIN validator ──► BareGtin          │
//! │                     │                                                   │
//! │                     └── rejected ──► None (not ours, release scan)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Check Digit Asymmetry
//! GTINs lifted from an element string are trusted as encoded. Bare codes are
//! always validated. [`NormalizeOptions::verify_element_check_digit`] opts in
//! to validating both paths.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ai;
use crate::element::{AiValues, ElementString};
use crate::error::{IdentifyError, IdentifyResult, ParseHalt};
use crate::gtin::{validate_gtin, Gtin14};

// =============================================================================
// Identifier Source
// =============================================================================

/// Which normalization path produced the identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum IdentifierSource {
    /// GS1 element string with a product AI.
    ElementString,
    /// Bare numeric GTIN-12/13/14.
    BareGtin,
}

// =============================================================================
// Parsed Identifiers
// =============================================================================

/// The structured identifiers recognized in one scan.
///
/// Produced once per scan and passed by value to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParsedIdentifiers {
    /// Canonical product code.
    pub gtin14: Option<Gtin14>,

    /// Batch or lot number, AI (10).
    pub lot: Option<String>,

    /// Expiration date as encoded, YYMMDD, AI (17).
    pub expiry: Option<String>,

    /// Unit count, AI (37) or else AI (30).
    pub quantity: Option<u32>,

    /// Best before date as encoded, YYMMDD, AI (15).
    pub best_before: Option<String>,

    /// Serial Shipping Container Code, AI (00).
    pub sscc: Option<String>,

    /// Which path recognized the scan.
    pub source: IdentifierSource,
}

impl ParsedIdentifiers {
    /// Identifiers for a bare GTIN: everything but the product code is absent.
    pub fn bare(gtin14: Gtin14) -> Self {
        ParsedIdentifiers {
            gtin14: Some(gtin14),
            lot: None,
            expiry: None,
            quantity: None,
            best_before: None,
            sscc: None,
            source: IdentifierSource::BareGtin,
        }
    }

    fn from_element(gtin14: Gtin14, values: &AiValues) -> Self {
        let owned = |code: &str| values.get(code).map(str::to_string);
        let quantity = values
            .get(ai::COUNT)
            .or_else(|| values.get(ai::VAR_COUNT))
            .and_then(|v| v.parse::<u32>().ok());

        ParsedIdentifiers {
            gtin14: Some(gtin14),
            lot: owned(ai::BATCH_LOT),
            expiry: owned(ai::EXPIRY),
            quantity,
            best_before: owned(ai::BEST_BEFORE),
            sscc: owned(ai::SSCC),
            source: IdentifierSource::ElementString,
        }
    }

    /// The product code as a plain string, for logging.
    pub fn gtin(&self) -> Option<&str> {
        self.gtin14.as_ref().map(Gtin14::as_str)
    }

    /// Quantity to apply: the encoded count, or 1.
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    /// Decoded expiration date.
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry.as_deref().and_then(decode_yymmdd)
    }

    /// Decoded best before date.
    pub fn best_before_date(&self) -> Option<NaiveDate> {
        self.best_before.as_deref().and_then(decode_yymmdd)
    }
}

/// Decodes a GS1 YYMMDD date.
///
/// ## Rules
/// - Years 00-49 are 20xx, 50-99 are 19xx
/// - Day `00` means the last day of the month
pub fn decode_yymmdd(value: &str) -> Option<NaiveDate> {
    if value.len() != 6 || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let yy: i32 = value[0..2].parse().ok()?;
    let month: u32 = value[2..4].parse().ok()?;
    let day: u32 = value[4..6].parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };

    if day == 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        return next_month.pred_opt().filter(|d| d.month() == first.month());
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

// =============================================================================
// Options
// =============================================================================

/// Switches for the normalization paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Enable the bare-GTIN fallback.
    pub accept_bare_gtin: bool,

    /// Validate the check digit of element-string GTINs as well.
    pub verify_element_check_digit: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            accept_bare_gtin: true,
            verify_element_check_digit: false,
        }
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Normalizes a raw scan with default options.
///
/// ## Example
/// ```rust
/// use dock_core::identifiers::{normalize, IdentifierSource};
///
/// let ids = normalize("01123456789012311719012310ABC123").unwrap();
/// assert_eq!(ids.gtin(), Some("12345678901231"));
/// assert_eq!(ids.expiry.as_deref(), Some("190123"));
/// assert_eq!(ids.lot.as_deref(), Some("ABC123"));
///
/// let ids = normalize("012345678905").unwrap();
/// assert_eq!(ids.gtin(), Some("00012345678905"));
/// assert_eq!(ids.source, IdentifierSource::BareGtin);
///
/// assert!(normalize("not a barcode").is_none());
/// ```
pub fn normalize(raw: &str) -> Option<ParsedIdentifiers> {
    normalize_with(raw, NormalizeOptions::default())
}

/// Normalizes a raw scan. `None` means "not a recognized identifier".
pub fn normalize_with(raw: &str, options: NormalizeOptions) -> Option<ParsedIdentifiers> {
    identify_with(raw, options).ok()
}

/// Like [`normalize`], but reports why a scan was not recognized.
pub fn identify(raw: &str) -> IdentifyResult<ParsedIdentifiers> {
    identify_with(raw, NormalizeOptions::default())
}

/// Like [`normalize_with`], but reports why a scan was not recognized.
pub fn identify_with(raw: &str, options: NormalizeOptions) -> IdentifyResult<ParsedIdentifiers> {
    let tokenized = ElementString::new(raw).tokenize();

    if let Some(gtin) = product_code(&tokenized.values, options) {
        return Ok(ParsedIdentifiers::from_element(gtin, &tokenized.values));
    }

    if !options.accept_bare_gtin {
        return Err(not_recognized(tokenized.halt, "bare GTIN scans are disabled"));
    }

    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match validate_gtin(&compact) {
        Ok(gtin) => Ok(ParsedIdentifiers::bare(gtin)),
        Err(err) => Err(not_recognized(tokenized.halt, &err.to_string())),
    }
}

/// Picks the product code from AI (01), else AI (02).
fn product_code(values: &AiValues, options: NormalizeOptions) -> Option<Gtin14> {
    [ai::GTIN, ai::CONTENT]
        .into_iter()
        .filter_map(|code| values.get(code))
        .filter_map(Gtin14::from_element_value)
        .find(|gtin| !options.verify_element_check_digit || gtin.has_valid_check_digit())
}

fn not_recognized(halt: Option<ParseHalt>, reason: &str) -> IdentifyError {
    match halt {
        Some(halt @ (ParseHalt::Truncated { .. } | ParseHalt::SeparatorInFixedField { .. })) => {
            IdentifyError::AmbiguousInput(halt)
        }
        _ => IdentifyError::NotRecognized {
            reason: reason.to_string(),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GS: char = ai::GROUP_SEPARATOR;

    #[test]
    fn test_element_string_example() {
        let ids = normalize("01123456789012311719012310ABC123").unwrap();
        assert_eq!(ids.gtin(), Some("12345678901231"));
        assert_eq!(ids.expiry.as_deref(), Some("190123"));
        assert_eq!(ids.lot.as_deref(), Some("ABC123"));
        assert_eq!(ids.quantity, None);
        assert_eq!(ids.source, IdentifierSource::ElementString);
    }

    #[test]
    fn test_element_gtin_is_not_revalidated() {
        // Last digit is wrong, still accepted from an element string
        let ids = normalize("0112345678901234").unwrap();
        assert_eq!(ids.gtin(), Some("12345678901234"));
    }

    #[test]
    fn test_verify_option_rejects_bad_element_gtin() {
        let options = NormalizeOptions {
            verify_element_check_digit: true,
            ..NormalizeOptions::default()
        };
        assert!(normalize_with("0112345678901234", options).is_none());
        assert!(normalize_with("0112345678901231", options).is_some());
    }

    #[test]
    fn test_contained_trade_item_is_equivalent() {
        let raw = format!("0210614141000415{GS}3712");
        let ids = normalize(&raw).unwrap();
        assert_eq!(ids.gtin(), Some("10614141000415"));
        assert_eq!(ids.quantity, Some(12));
    }

    #[test]
    fn test_count_preferred_over_variable_count() {
        let raw = "(01)12345678901231(30)5(37)7";
        assert_eq!(normalize(raw).unwrap().quantity, Some(7));

        let raw = format!("0112345678901231305{GS}10L1");
        let ids = normalize(&raw).unwrap();
        assert_eq!(ids.quantity, Some(5));
        assert_eq!(ids.effective_quantity(), 5);
    }

    #[test]
    fn test_extra_identifiers() {
        let raw = "(00)106141411234567897(02)10614141000415(15)240630(10)B-7";
        let ids = normalize(raw).unwrap();
        assert_eq!(ids.sscc.as_deref(), Some("106141411234567897"));
        assert_eq!(ids.best_before.as_deref(), Some("240630"));
        assert_eq!(ids.lot.as_deref(), Some("B-7"));
        assert_eq!(ids.effective_quantity(), 1);
    }

    #[test]
    fn test_bare_gtin_fallback() {
        let ids = normalize("  4006381333931 ").unwrap();
        assert_eq!(ids.gtin(), Some("04006381333931"));
        assert_eq!(ids.source, IdentifierSource::BareGtin);
        assert!(ids.lot.is_none() && ids.expiry.is_none() && ids.quantity.is_none());

        // Internal whitespace is stripped too
        let ids = normalize("0123 4567 8905").unwrap();
        assert_eq!(ids.gtin(), Some("00012345678905"));

        // A GTIN-14 that tokenizes as a lot still falls back
        let ids = normalize("10614141000415").unwrap();
        assert_eq!(ids.gtin(), Some("10614141000415"));
        assert_eq!(ids.source, IdentifierSource::BareGtin);
    }

    #[test]
    fn test_bare_fallback_can_be_disabled() {
        let options = NormalizeOptions {
            accept_bare_gtin: false,
            ..NormalizeOptions::default()
        };
        assert!(normalize_with("012345678905", options).is_none());
        assert!(normalize_with("0112345678901231", options).is_some());
    }

    #[test]
    fn test_malformed_inputs_are_absent() {
        for raw in [
            "",
            "hello",
            "01234567890A",
            "012345678904",
            "96385074",
            "10ABC",
            "(17)190123",
            "0112345",
        ] {
            assert!(normalize(raw).is_none(), "{raw:?}");
        }
    }

    #[test]
    fn test_identify_reports_ambiguity() {
        let err = identify("10ABC\u{1d}011234567").unwrap_err();
        assert!(err.is_ambiguous());

        let err = identify("hello").unwrap_err();
        assert!(matches!(err, IdentifyError::NotRecognized { .. }));
    }

    #[test]
    fn test_decode_dates() {
        let ids = normalize("0112345678901231172402001524123110X").unwrap();
        assert_eq!(ids.expiry_date(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(ids.best_before_date(), NaiveDate::from_ymd_opt(2024, 12, 31));

        assert_eq!(decode_yymmdd("990101"), NaiveDate::from_ymd_opt(1999, 1, 1));
        assert_eq!(decode_yymmdd("491200"), NaiveDate::from_ymd_opt(2049, 12, 31));
        assert_eq!(decode_yymmdd("251300"), None);
        assert_eq!(decode_yymmdd("250231"), None);
        assert_eq!(decode_yymmdd("2501"), None);
    }

    #[test]
    fn test_wire_shape() {
        let ids = normalize("01123456789012311719012310ABC123").unwrap();
        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json["gtin14"], "12345678901231");
        assert_eq!(json["source"], "element_string");
        assert!(json["quantity"].is_null());
    }
}
