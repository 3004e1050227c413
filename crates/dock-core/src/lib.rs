//! # dock-core: Pure Scan Interpretation for Dock Receiving
//!
//! Turns raw scanner text into structured product identifiers. Everything in
//! this crate is a pure function of its input with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Dock Receiving Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Receiving Screen (host)                         │   │
//! │  │     event bus ── key capture ── input field                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ raw scan text                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 dock-scan (Coordinator)                         │   │
//! │  │     claim ownership, coalesce, resolve or release               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dock-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────┐     │   │
//! │  │   │   ai    │  │ element  │  │   gtin   │  │ identifiers │     │   │
//! │  │   │  rules  │  │  parser  │  │  Mod-10  │  │   facade    │     │   │
//! │  │   └─────────┘  └──────────┘  └──────────┘  └─────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO ASYNC • NO LOGGING • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ai`] - Application Identifier rule table
//! - [`element`] - GS1 element string tokenizer
//! - [`gtin`] - Check digit math and the `Gtin14` type
//! - [`identifiers`] - The normalization facade
//! - [`types`] - Scan events, context and resolver outcomes
//! - [`error`] - Diagnostic error types
//!
//! ## Example Usage
//!
//! ```rust
//! use dock_core::normalize;
//!
//! let ids = normalize("]C1(01)12345678901231(17)190123(10)ABC123").unwrap();
//! assert_eq!(ids.gtin(), Some("12345678901231"));
//! assert_eq!(ids.lot.as_deref(), Some("ABC123"));
//!
//! // Not ours: the caller hands the scan back to default handling
//! assert!(normalize("SKU-4711").is_none());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod ai;
pub mod element;
pub mod error;
pub mod gtin;
pub mod identifiers;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use element::{parse, AiValues};
pub use error::{GtinError, IdentifyError, ParseHalt};
pub use gtin::{check_digit, normalize_to_gtin14, Gtin14};
pub use identifiers::{
    identify, identify_with, normalize, normalize_with, IdentifierSource, NormalizeOptions,
    ParsedIdentifiers,
};
pub use types::*;
