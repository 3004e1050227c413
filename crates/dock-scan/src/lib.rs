//! # dock-scan: Scan Engine for Dock Receiving
//!
//! Intercepts scans on the receiving screen, interprets each one exactly
//! once, and drives the resolution protocol with the inventory backend.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ScanCoordinator (Main Orchestrator)              │  │
//! │  │                                                                  │  │
//! │  │  activate(screen_ready) / teardown()                            │  │
//! │  │  One registration per instance, one generation per activation   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Surfaces       │  │ Dispatcher     │  │ ResolutionClient       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ ScanSink.offer │  │ Arrival order, │  │ resolve_identifiers    │    │
//! │  │ claims before  │─►│ gesture repeats│─►│ picker / confirm       │    │
//! │  │ any await      │  │ once, identify │  │ notifications          │    │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │                              │ not recognized                           │
//! │                              ▼                                          │
//! │                     DefaultHandler (exactly once)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`coordinator`] - `ScanCoordinator`, lifecycle and dispatch
//! - [`surface`] - Surface trait, sinks, claims and released scans
//! - [`surfaces`] - Bus and input field attachment strategies
//! - [`resolution`] - Variant selection and pending choices
//! - [`services`] - Host collaborator traits
//! - [`protocol`] - Resolver request payloads
//! - [`config`] - Engine configuration (TOML + env)
//! - [`lifecycle`] - Coordinator state
//! - [`stats`] - Scan counters
//! - [`error`] - Engine and resolver errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dock_scan::{InputField, ReceivingScreen, ScanConfig, ScanCoordinator, ScanServices};
//!
//! let config = ScanConfig::load_or_default(None);
//! let services = ScanServices::new(resolver, context).with_notifier(notifier);
//! let coordinator = ScanCoordinator::new(&config, services)?;
//!
//! let field = InputField::new();
//! coordinator.activate(async move {
//!     screen_ready.await;
//!     Some(ReceivingScreen::new().with_surface(field.surface(default_handler)))
//! })?;
//!
//! // Leaving the screen
//! coordinator.teardown();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coalesce;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod resolution;
pub mod services;
pub mod stats;
pub mod surface;
pub mod surfaces;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coalesce::Gesture;
pub use config::{MessageSettings, ScanConfig, ScanSettings, StationConfig};
pub use coordinator::ScanCoordinator;
pub use error::{ResolverError, ScanError, ScanResult};
pub use lifecycle::CoordinatorState;
pub use protocol::{ConfirmRequest, ResolveRequest, ResolverCall};
pub use resolution::{PendingChoice, VariantSelection};
pub use services::{
    ContextProvider, DismissingPicker, InventoryResolver, NoOpNotifier, Notifier, ScanServices,
    VariantPicker,
};
pub use stats::ScanStats;
pub use surface::{Claim, DefaultHandler, ReceivingScreen, ReleasedScan, ScanSink, ScanSurface};
pub use surfaces::{BusSurface, InputField, InputFieldSurface, ScanBus, SubmitTrigger};
