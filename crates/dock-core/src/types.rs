//! # Domain Types
//!
//! Scan events, picking context and the resolver's outcome shapes.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │   ScanEvent     │   │ PickingContext  │   │  ResolutionOutcome   │  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────────  │  │
//! │  │  id (UUID)      │   │  picking_id     │   │  Ok                  │  │
//! │  │  raw_text       │   │   (Option<i64>) │   │  NeedsVariantChoice  │  │
//! │  │  source         │   └─────────────────┘   │  Error               │  │
//! │  │  timestamp      │                         └──────────────────────┘  │
//! │  └─────────────────┘   ┌─────────────────┐   ┌──────────────────────┐  │
//! │                        │VariantCandidate │   │   ConfirmOutcome     │  │
//! │  ┌─────────────────┐   │  ─────────────  │   │  ──────────────────  │  │
//! │  │   ScanSource    │   │  id, uom        │   │  Ok | Error          │  │
//! │  │  Bus, Dom...    │   │  display_name   │   └──────────────────────┘  │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Shape
//! Outcomes are tagged with `status` in snake_case so the receiving screen can
//! switch on a single field:
//! ```json
//! { "status": "needs_variant_choice", "candidates": [ ... ] }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Scan Source
// =============================================================================

/// The input surface that first observed a physical scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScanSource {
    /// Application event bus.
    Bus,
    /// Global key capture on the page.
    DomCapture,
    /// A focused input element.
    InputField,
    /// Anything else the host wires in.
    Custom,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Bus => write!(f, "bus"),
            ScanSource::DomCapture => write!(f, "dom_capture"),
            ScanSource::InputField => write!(f, "input_field"),
            ScanSource::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for ScanSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bus" => Ok(ScanSource::Bus),
            "dom_capture" => Ok(ScanSource::DomCapture),
            "input_field" => Ok(ScanSource::InputField),
            "custom" => Ok(ScanSource::Custom),
            _ => Err(format!("Unknown scan source: {}", s)),
        }
    }
}

// =============================================================================
// Scan Event
// =============================================================================

/// One physical scan, as captured by the first surface to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Identity of this scan. Correlates logs and keys confirmations.
    pub id: Uuid,

    /// Text exactly as captured, before any handler could clear it.
    pub raw_text: String,

    /// Which surface captured it.
    pub source: ScanSource,

    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    /// Captures a new scan now.
    pub fn new(raw_text: impl Into<String>, source: ScanSource) -> Self {
        ScanEvent {
            id: Uuid::new_v4(),
            raw_text: raw_text.into(),
            source,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Picking Context
// =============================================================================

/// Which receiving record, if any, is active right now.
///
/// A snapshot. Recomputed for every scan, never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PickingContext {
    pub picking_id: Option<i64>,
}

impl PickingContext {
    /// Context with an active picking.
    pub const fn picking(id: i64) -> Self {
        PickingContext {
            picking_id: Some(id),
        }
    }

    /// Context with no active picking.
    pub const fn none() -> Self {
        PickingContext { picking_id: None }
    }
}

// =============================================================================
// Variant Candidate
// =============================================================================

/// A product variant offered for disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantCandidate {
    pub id: i64,
    pub display_name: String,
    /// Unit of measure name.
    pub uom: String,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of resolving identifiers against inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum ResolutionOutcome {
    /// Applied. The optional message is shown to the user.
    Ok { message: Option<String> },

    /// Several variants share the scanned code; the user must pick one.
    NeedsVariantChoice { candidates: Vec<VariantCandidate> },

    /// Nothing was applied.
    Error { message: String },
}

impl ResolutionOutcome {
    /// Shorthand for an `Error` outcome.
    pub fn error(message: impl Into<String>) -> Self {
        ResolutionOutcome::Error {
            message: message.into(),
        }
    }

    /// Outcome label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Ok { .. } => "ok",
            ResolutionOutcome::NeedsVariantChoice { .. } => "needs_variant_choice",
            ResolutionOutcome::Error { .. } => "error",
        }
    }
}

/// Result of confirming a chosen variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum ConfirmOutcome {
    Ok { message: Option<String> },
    Error { message: String },
}

impl ConfirmOutcome {
    /// Shorthand for an `Error` outcome.
    pub fn error(message: impl Into<String>) -> Self {
        ConfirmOutcome::Error {
            message: message.into(),
        }
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Danger => write!(f, "danger"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_source_round_trip() {
        for source in [
            ScanSource::Bus,
            ScanSource::DomCapture,
            ScanSource::InputField,
            ScanSource::Custom,
        ] {
            assert_eq!(source.to_string().parse::<ScanSource>(), Ok(source));
        }
        assert!("keyboard".parse::<ScanSource>().is_err());
    }

    #[test]
    fn test_scan_events_get_distinct_ids() {
        let a = ScanEvent::new("0112345678901231", ScanSource::Bus);
        let b = ScanEvent::new("0112345678901231", ScanSource::Bus);
        assert_ne!(a.id, b.id);
        assert_eq!(a.raw_text, b.raw_text);
    }

    #[test]
    fn test_outcome_wire_tags() {
        let outcome = ResolutionOutcome::NeedsVariantChoice {
            candidates: vec![VariantCandidate {
                id: 7,
                display_name: "Shirt (M)".into(),
                uom: "Units".into(),
            }],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "needs_variant_choice");
        assert_eq!(json["candidates"][0]["display_name"], "Shirt (M)");

        let parsed: ResolutionOutcome =
            serde_json::from_str(r#"{"status":"error","message":"Picking not found"}"#).unwrap();
        assert_eq!(parsed, ResolutionOutcome::error("Picking not found"));
        assert_eq!(parsed.label(), "error");

        let parsed: ConfirmOutcome =
            serde_json::from_str(r#"{"status":"ok","message":null}"#).unwrap();
        assert_eq!(parsed, ConfirmOutcome::Ok { message: None });
    }

    #[test]
    fn test_picking_context_defaults_to_none() {
        assert_eq!(PickingContext::default(), PickingContext::none());
        assert_eq!(PickingContext::picking(4).picking_id, Some(4));
    }
}
