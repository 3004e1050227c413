//! # Host Collaborators
//!
//! The interfaces the engine needs from its host. Inventory lookup, user
//! feedback, the variant dialog and screen state all live outside this crate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ScanServices                                    │
//! │                                                                         │
//! │  InventoryResolver   resolve_identifiers / confirm_variant  (async)    │
//! │  Notifier            notify(message, severity)              (fire)     │
//! │  VariantPicker       open(candidates, on_select)            (fire)     │
//! │  ContextProvider     current_picking_context()              (sync)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use futures_util::future::BoxFuture;

use dock_core::{ConfirmOutcome, PickingContext, ResolutionOutcome, Severity, VariantCandidate};

use crate::error::ResolverError;
use crate::protocol::{ConfirmRequest, ResolveRequest};
use crate::resolution::VariantSelection;

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Inventory resolution service.
pub trait InventoryResolver: Send + Sync {
    /// Resolves a scan against inventory.
    fn resolve_identifiers(
        &self,
        request: ResolveRequest,
    ) -> BoxFuture<'_, Result<ResolutionOutcome, ResolverError>>;

    /// Applies the variant chosen after a `NeedsVariantChoice`.
    fn confirm_variant(
        &self,
        request: ConfirmRequest,
    ) -> BoxFuture<'_, Result<ConfirmOutcome, ResolverError>>;
}

/// Fire-and-forget user feedback.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Variant disambiguation dialog.
///
/// The picker owns `on_select` from here on. Calling
/// [`VariantSelection::select`] issues the confirmation; dropping it is a
/// dismissal.
pub trait VariantPicker: Send + Sync {
    fn open(&self, candidates: Vec<VariantCandidate>, on_select: VariantSelection);
}

/// Snapshot of the active receiving record.
pub trait ContextProvider: Send + Sync {
    fn current_picking_context(&self) -> PickingContext;
}

impl<F> ContextProvider for F
where
    F: Fn() -> PickingContext + Send + Sync,
{
    fn current_picking_context(&self) -> PickingContext {
        self()
    }
}

// =============================================================================
// No-op Implementations
// =============================================================================

/// Notifier that drops every message.
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Picker that dismisses every choice immediately.
pub struct DismissingPicker;

impl VariantPicker for DismissingPicker {
    fn open(&self, _candidates: Vec<VariantCandidate>, _on_select: VariantSelection) {}
}

// =============================================================================
// Service Bundle
// =============================================================================

/// Everything the engine calls out to.
#[derive(Clone)]
pub struct ScanServices {
    pub resolver: Arc<dyn InventoryResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub picker: Arc<dyn VariantPicker>,
    pub context: Arc<dyn ContextProvider>,
}

impl ScanServices {
    /// Bundles a resolver and context source with silent feedback and a
    /// picker that dismisses.
    pub fn new(resolver: Arc<dyn InventoryResolver>, context: Arc<dyn ContextProvider>) -> Self {
        ScanServices {
            resolver,
            notifier: Arc::new(NoOpNotifier),
            picker: Arc::new(DismissingPicker),
            context,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_picker(mut self, picker: Arc<dyn VariantPicker>) -> Self {
        self.picker = picker;
        self
    }
}

impl std::fmt::Debug for ScanServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanServices").finish_non_exhaustive()
    }
}
