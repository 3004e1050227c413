//! # GTIN Normalizer/Validator
//!
//! GS1 Mod-10 check digits and canonical 14-digit GTINs.
//!
//! ## Check Digit Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    GS1 Weighted Mod-10                                  │
//! │                                                                         │
//! │  body:     0  1  2  3  4  5  6  7  8  9  0                             │
//! │  offset:  10  9  8  7  6  5  4  3  2  1  0   (rightmost = 0)           │
//! │  weight:   3  1  3  1  3  1  3  1  3  1  3   (even offset ×3, odd ×1)  │
//! │                                                                         │
//! │  sum = Σ digit × weight = 95                                           │
//! │  check = (10 - sum mod 10) mod 10 = 5                                  │
//! │                                                                         │
//! │  "012345678905" ✓                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Canonical Form
//! GTIN-8, GTIN-12 and GTIN-13 map losslessly into the GTIN-14 namespace by
//! left-padding with zeros. Padding does not change the check digit because
//! leading zeros contribute nothing to the weighted sum.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{GtinError, GtinResult};

/// Length of the canonical GTIN form.
pub const GTIN14_LEN: usize = 14;

/// Bare code lengths accepted by [`normalize_to_gtin14`].
pub const ACCEPTED_LENGTHS: [usize; 3] = [12, 13, 14];

// =============================================================================
// Check Digit
// =============================================================================

/// Computes the GS1 Mod-10 check digit for a digit string body.
///
/// Returns `None` if the body is empty or contains a non-digit.
///
/// ## Example
/// ```rust
/// use dock_core::gtin::check_digit;
///
/// assert_eq!(check_digit("01234567890"), Some(5));
/// assert_eq!(check_digit("0123456789012"), Some(8));
/// assert_eq!(check_digit("12A"), None);
/// ```
pub fn check_digit(body: &str) -> Option<u8> {
    if body.is_empty() {
        return None;
    }

    let mut sum: u32 = 0;
    for (offset, c) in body.chars().rev().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if offset % 2 == 0 { digit * 3 } else { digit };
    }

    Some(((10 - sum % 10) % 10) as u8)
}

/// Returns true if the last digit of `code` is the check digit of the rest.
pub fn has_valid_check_digit(code: &str) -> bool {
    if code.len() < 2 || !code.is_ascii() {
        return false;
    }
    let (body, supplied) = code.split_at(code.len() - 1);
    match (check_digit(body), supplied.chars().next().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(found)) => u32::from(expected) == found,
        _ => false,
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validates a bare numeric GTIN-12/13/14 and returns its canonical form.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must contain only ASCII digits
/// - Must be exactly 12, 13 or 14 digits long
/// - Last digit must equal the check digit of the preceding digits
pub fn validate_gtin(raw: &str) -> GtinResult<Gtin14> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(GtinError::Empty);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(GtinError::NonDigit);
    }

    if !ACCEPTED_LENGTHS.contains(&code.len()) {
        return Err(GtinError::InvalidLength(code.len()));
    }

    let (body, supplied) = code.split_at(code.len() - 1);
    let expected = check_digit(body).ok_or(GtinError::NonDigit)?;
    let found = supplied.as_bytes()[0] - b'0';
    if expected != found {
        return Err(GtinError::CheckDigitMismatch { expected, found });
    }

    Ok(Gtin14(format!("{code:0>width$}", width = GTIN14_LEN)))
}

/// Normalizes a bare numeric GTIN-12/13/14 to its 14-digit form.
///
/// Returns `None` for anything [`validate_gtin`] rejects.
///
/// ## Example
/// ```rust
/// use dock_core::gtin::normalize_to_gtin14;
///
/// assert_eq!(
///     normalize_to_gtin14("012345678905").as_deref(),
///     Some("00012345678905")
/// );
/// assert_eq!(normalize_to_gtin14("012345678904"), None); // bad check digit
/// assert_eq!(normalize_to_gtin14("96385074"), None);     // GTIN-8 not accepted bare
/// ```
pub fn normalize_to_gtin14(raw: &str) -> Option<String> {
    validate_gtin(raw).ok().map(Gtin14::into_string)
}

// =============================================================================
// Gtin14
// =============================================================================

/// A 14-digit GTIN.
///
/// ## Invariant
/// Always exactly 14 ASCII digits. Values built with [`Gtin14::validated`]
/// also carry a correct check digit; values lifted from an element string with
/// [`Gtin14::from_element_value`] are trusted as encoded and may not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export, as = "String")]
pub struct Gtin14(String);

impl Gtin14 {
    /// Builds a GTIN-14 from a bare code, enforcing the check digit.
    pub fn validated(raw: &str) -> Option<Self> {
        validate_gtin(raw).ok()
    }

    /// Lifts an AI (01)/(02) value. Requires 14 digits, trusts the check digit.
    pub fn from_element_value(value: &str) -> Option<Self> {
        if value.len() == GTIN14_LEN && value.chars().all(|c| c.is_ascii_digit()) {
            Some(Gtin14(value.to_string()))
        } else {
            None
        }
    }

    /// The 14 digits.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the GTIN, returning its digits.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }

    /// The indicator digit (packaging level), the first of the 14.
    pub fn indicator(&self) -> u8 {
        self.0.as_bytes()[0] - b'0'
    }

    /// The supplied check digit, the last of the 14.
    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[GTIN14_LEN - 1] - b'0'
    }

    /// Returns true if the supplied check digit matches the computed one.
    pub fn has_valid_check_digit(&self) -> bool {
        has_valid_check_digit(&self.0)
    }
}

impl std::fmt::Display for Gtin14 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Gtin14 {
    type Err = GtinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_gtin(s)
    }
}

impl TryFrom<String> for Gtin14 {
    type Error = GtinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Gtin14::from_element_value(&value).ok_or(GtinError::InvalidLength(value.len()))
    }
}

impl From<Gtin14> for String {
    fn from(gtin: Gtin14) -> Self {
        gtin.0
    }
}

impl AsRef<str> for Gtin14 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends the computed check digit to a body.
    fn complete(body: &str) -> String {
        format!("{body}{}", check_digit(body).unwrap())
    }

    #[test]
    fn test_check_digit_known_values() {
        assert_eq!(check_digit("01234567890"), Some(5));
        assert_eq!(check_digit("400638133393"), Some(1));
        assert_eq!(check_digit("590123412345"), Some(7));
        assert_eq!(check_digit("1061414100041"), Some(5));
        assert_eq!(check_digit(""), None);
        assert_eq!(check_digit("12 4"), None);
    }

    #[test]
    fn test_gs1_sample_normalizes_with_padding() {
        let gtin = normalize_to_gtin14("012345678905").unwrap();
        assert_eq!(gtin.len(), 14);
        assert!(gtin.starts_with("00"));
        assert_eq!(&gtin[2..], "012345678905");

        // Re-deriving the check digit from the first 13 reproduces the 14th
        let expected = check_digit(&gtin[..13]).unwrap();
        assert_eq!(gtin.as_bytes()[13] - b'0', expected);
    }

    #[test]
    fn test_valid_codes_of_every_accepted_length() {
        let bodies = [
            "01234567890",
            "12345678901",
            "400638133393",
            "590123412345",
            "0000000000000",
            "9999999999999",
            "1061414100041",
        ];
        for body in bodies {
            let code = complete(body);
            let gtin = normalize_to_gtin14(&code)
                .unwrap_or_else(|| panic!("{code} should be accepted"));
            assert_eq!(gtin, format!("{code:0>14}"));
        }
    }

    #[test]
    fn test_every_wrong_check_digit_is_rejected() {
        for body in ["01234567890", "400638133393", "1061414100041"] {
            let good = check_digit(body).unwrap();
            for wrong in (0..10u8).filter(|d| *d != good) {
                let code = format!("{body}{wrong}");
                assert_eq!(normalize_to_gtin14(&code), None, "{code}");
                assert_eq!(
                    validate_gtin(&code),
                    Err(GtinError::CheckDigitMismatch {
                        expected: good,
                        found: wrong
                    })
                );
            }
        }
    }

    #[test]
    fn test_rejects_bad_lengths_and_characters() {
        assert_eq!(validate_gtin(""), Err(GtinError::Empty));
        assert_eq!(validate_gtin("96385074"), Err(GtinError::InvalidLength(8)));
        assert_eq!(
            validate_gtin("000012345678905"),
            Err(GtinError::InvalidLength(15))
        );
        assert_eq!(validate_gtin("01234567890A"), Err(GtinError::NonDigit));
        assert_eq!(validate_gtin("0123 4567890"), Err(GtinError::NonDigit));
        assert_eq!(validate_gtin("-12345678905"), Err(GtinError::NonDigit));
    }

    #[test]
    fn test_output_revalidates() {
        for code in ["012345678905", "4006381333931", "10614141000415"] {
            let once = normalize_to_gtin14(code).unwrap();
            let twice = normalize_to_gtin14(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_gtin14_accessors() {
        let gtin = Gtin14::validated("10614141000415").unwrap();
        assert_eq!(gtin.indicator(), 1);
        assert_eq!(gtin.check_digit(), 5);
        assert!(gtin.has_valid_check_digit());
        assert_eq!(gtin.to_string(), "10614141000415");
        assert_eq!("012345678905".parse::<Gtin14>().unwrap().as_str(), "00012345678905");
    }

    #[test]
    fn test_element_value_trusts_check_digit() {
        let gtin = Gtin14::from_element_value("12345678901234").unwrap();
        assert!(!gtin.has_valid_check_digit());
        assert!(Gtin14::from_element_value("1234567890123").is_none());
        assert!(Gtin14::from_element_value("1234567890123X").is_none());
    }

    #[test]
    fn test_gtin14_serde_is_plain_string() {
        let gtin = Gtin14::validated("012345678905").unwrap();
        let json = serde_json::to_string(&gtin).unwrap();
        assert_eq!(json, "\"00012345678905\"");

        let back: Gtin14 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gtin);
        assert!(serde_json::from_str::<Gtin14>("\"123\"").is_err());
    }
}
