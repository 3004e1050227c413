//! # Resolution Protocol Client
//!
//! Issues the single resolve call for each accepted scan and acts on the
//! outcome.
//!
//! ## Outcome Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Resolution Flow                                   │
//! │                                                                         │
//! │  accepted scan                                                         │
//! │       │  context recomputed now, not at attach time                    │
//! │       ▼                                                                 │
//! │  resolve_identifiers ── fault / timeout ──► Error                      │
//! │       │                                                                 │
//! │       ├── Ok ─────────────────► notify success, done                   │
//! │       ├── Error ──────────────► notify danger, done (not re-offered)   │
//! │       └── NeedsVariantChoice                                           │
//! │              │ zero candidates ► treated as Error                      │
//! │              ▼                                                          │
//! │        picker.open(candidates, VariantSelection)                       │
//! │              │                                                          │
//! │              ├── select(id) ──► confirm_variant (exactly once)         │
//! │              └── dropped ─────► parked for reopen_choice(scan_id)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Outcomes that land after the coordinator was torn down are dropped
//! silently: the screen they targeted is gone.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dock_core::{
    ConfirmOutcome, ParsedIdentifiers, ResolutionOutcome, ScanEvent, Severity, VariantCandidate,
};

use crate::config::{MessageSettings, ScanSettings};
use crate::error::{ResolverError, ScanError, ScanResult};
use crate::lifecycle::Liveness;
use crate::protocol::{ConfirmRequest, ResolveRequest};
use crate::services::ScanServices;
use crate::stats::{Activity, ActivityGuard, StatsCounters};

// =============================================================================
// Scan Ticket
// =============================================================================

/// An accepted scan on its way through resolution.
#[derive(Debug, Clone)]
pub(crate) struct ScanTicket {
    pub scan: ScanEvent,
    pub identifiers: ParsedIdentifiers,
    pub liveness: Liveness,
}

// =============================================================================
// Pending Choices
// =============================================================================

/// A dismissed variant choice that can still be reopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChoice {
    pub scan_id: Uuid,
    pub raw_text: String,
    pub candidates: Vec<VariantCandidate>,
    /// Reopens left, counting the next one.
    pub reopens_left: u32,
}

struct DeferredChoice {
    ticket: ScanTicket,
    candidates: Vec<VariantCandidate>,
    reopens_left: u32,
}

#[derive(Default)]
struct ChoiceBook {
    deferred: Mutex<Vec<DeferredChoice>>,
}

impl ChoiceBook {
    fn lock(&self) -> MutexGuard<'_, Vec<DeferredChoice>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn park(&self, choice: DeferredChoice) {
        let mut deferred = self.lock();
        deferred.retain(|c| c.ticket.scan.id != choice.ticket.scan.id);
        deferred.push(choice);
    }

    fn take(&self, scan_id: Uuid) -> Option<DeferredChoice> {
        let mut deferred = self.lock();
        let index = deferred.iter().position(|c| c.ticket.scan.id == scan_id)?;
        Some(deferred.remove(index))
    }

    fn list(&self) -> Vec<PendingChoice> {
        self.lock()
            .iter()
            .filter(|c| c.ticket.liveness.is_live())
            .map(|c| PendingChoice {
                scan_id: c.ticket.scan.id,
                raw_text: c.ticket.scan.raw_text.clone(),
                candidates: c.candidates.clone(),
                reopens_left: c.reopens_left,
            })
            .collect()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

// =============================================================================
// Variant Selection
// =============================================================================

/// One-shot selection callback handed to the [`VariantPicker`](crate::VariantPicker).
///
/// `select` consumes it and issues exactly one confirmation. Dropping it
/// without selecting is a dismissal; if reopens remain the choice is parked
/// for [`ScanCoordinator::reopen_choice`](crate::ScanCoordinator::reopen_choice).
pub struct VariantSelection {
    scan_id: Uuid,
    candidates: Vec<VariantCandidate>,
    pending: Option<PendingSelection>,
}

struct PendingSelection {
    client: Arc<ResolutionClient>,
    ticket: ScanTicket,
    reopens_left: u32,
}

impl VariantSelection {
    /// The scan this choice belongs to.
    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    pub fn candidates(&self) -> &[VariantCandidate] {
        &self.candidates
    }

    /// Reopens left if this one is dismissed.
    pub fn reopens_left(&self) -> u32 {
        self.pending.as_ref().map_or(0, |p| p.reopens_left)
    }

    /// Chooses a candidate and sends the confirmation.
    ///
    /// An id that is not among the candidates hands the selection back
    /// unchanged.
    pub fn select(mut self, candidate_id: i64) -> Result<(), VariantSelection> {
        if !self.candidates.iter().any(|c| c.id == candidate_id) {
            return Err(self);
        }

        if let Some(pending) = self.pending.take() {
            pending.client.spawn_confirm(pending.ticket, candidate_id);
        }
        Ok(())
    }

    /// Dismisses the choice. Same as dropping it.
    pub fn dismiss(self) {}
}

impl Drop for VariantSelection {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            let candidates = std::mem::take(&mut self.candidates);
            pending
                .client
                .dismissed(pending.ticket, candidates, pending.reopens_left);
        }
    }
}

impl std::fmt::Debug for VariantSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantSelection")
            .field("scan_id", &self.scan_id)
            .field("candidates", &self.candidates.len())
            .field("reopens_left", &self.reopens_left())
            .finish()
    }
}

// =============================================================================
// Resolution Client
// =============================================================================

pub(crate) struct ResolutionClient {
    services: ScanServices,
    settings: ScanSettings,
    messages: MessageSettings,
    runtime: Handle,
    activity: Arc<Activity>,
    stats: Arc<StatsCounters>,
    choices: ChoiceBook,
}

impl ResolutionClient {
    pub fn new(
        services: ScanServices,
        settings: ScanSettings,
        messages: MessageSettings,
        runtime: Handle,
        activity: Arc<Activity>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        ResolutionClient {
            services,
            settings,
            messages,
            runtime,
            activity,
            stats,
            choices: ChoiceBook::default(),
        }
    }

    /// Starts the one resolve call for an accepted scan.
    pub fn spawn_resolve(self: &Arc<Self>, ticket: ScanTicket, guard: ActivityGuard) {
        let client = Arc::clone(self);
        self.runtime.spawn(async move {
            client.resolve(ticket).await;
            drop(guard);
        });
    }

    async fn resolve(self: Arc<Self>, ticket: ScanTicket) {
        let picking = self.services.context.current_picking_context();
        let scan_id = ticket.scan.id;

        info!(
            %scan_id,
            gtin = ?ticket.identifiers.gtin(),
            picking_id = ?picking.picking_id,
            "Resolving scan"
        );

        let request = ResolveRequest {
            scan_id,
            identifiers: ticket.identifiers.clone(),
            picking,
        };

        let outcome = match self
            .call(self.services.resolver.resolve_identifiers(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%scan_id, error = %e, retryable = e.is_retryable(), "Resolve call failed");
                ResolutionOutcome::error(self.messages.resolve_failed.clone())
            }
        };

        if !ticket.liveness.is_live() {
            debug!(%scan_id, outcome = outcome.label(), "Coordinator torn down, outcome dropped");
            return;
        }

        self.handle_outcome(ticket, outcome);
    }

    fn handle_outcome(self: &Arc<Self>, ticket: ScanTicket, outcome: ResolutionOutcome) {
        let scan_id = ticket.scan.id;

        match outcome {
            ResolutionOutcome::Ok { message } => {
                StatsCounters::bump(&self.stats.applied);
                info!(%scan_id, "Scan applied");
                let message = message.unwrap_or_else(|| self.messages.applied.clone());
                self.services.notifier.notify(&message, Severity::Success);
            }
            ResolutionOutcome::NeedsVariantChoice { candidates } if candidates.is_empty() => {
                StatsCounters::bump(&self.stats.failed);
                warn!(%scan_id, "Resolver asked for a variant choice without candidates");
                self.services
                    .notifier
                    .notify(&self.messages.no_candidates, Severity::Danger);
            }
            ResolutionOutcome::NeedsVariantChoice { candidates } => {
                StatsCounters::bump(&self.stats.awaiting_choice);
                info!(%scan_id, candidates = candidates.len(), "Scan needs a variant choice");
                self.open_picker(ticket, candidates, self.settings.max_choice_reopens);
            }
            ResolutionOutcome::Error { message } => {
                StatsCounters::bump(&self.stats.failed);
                warn!(%scan_id, %message, "Scan could not be applied");
                self.services.notifier.notify(&message, Severity::Danger);
            }
        }
    }

    fn open_picker(
        self: &Arc<Self>,
        ticket: ScanTicket,
        candidates: Vec<VariantCandidate>,
        reopens_left: u32,
    ) {
        let selection = VariantSelection {
            scan_id: ticket.scan.id,
            candidates: candidates.clone(),
            pending: Some(PendingSelection {
                client: Arc::clone(self),
                ticket,
                reopens_left,
            }),
        };
        self.services.picker.open(candidates, selection);
    }

    fn spawn_confirm(self: &Arc<Self>, ticket: ScanTicket, candidate_id: i64) {
        let guard = self.activity.begin();
        let client = Arc::clone(self);
        self.runtime.spawn(async move {
            client.confirm(ticket, candidate_id).await;
            drop(guard);
        });
    }

    async fn confirm(self: Arc<Self>, ticket: ScanTicket, candidate_id: i64) {
        StatsCounters::bump(&self.stats.confirmations);

        let picking = self.services.context.current_picking_context();
        let scan_id = ticket.scan.id;
        info!(%scan_id, candidate_id, picking_id = ?picking.picking_id, "Confirming variant");

        let request = ConfirmRequest {
            scan_id,
            candidate_id,
            identifiers: ticket.identifiers.clone(),
            picking,
        };

        let outcome = match self
            .call(self.services.resolver.confirm_variant(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%scan_id, candidate_id, error = %e, "Confirm call failed");
                ConfirmOutcome::error(self.messages.confirm_failed.clone())
            }
        };

        if !ticket.liveness.is_live() {
            debug!(%scan_id, "Coordinator torn down, confirmation outcome dropped");
            return;
        }

        match outcome {
            ConfirmOutcome::Ok { message } => {
                StatsCounters::bump(&self.stats.applied);
                info!(%scan_id, candidate_id, "Variant applied");
                let message = message.unwrap_or_else(|| self.messages.variant_added.clone());
                self.services.notifier.notify(&message, Severity::Success);
            }
            ConfirmOutcome::Error { message } => {
                StatsCounters::bump(&self.stats.failed);
                warn!(%scan_id, candidate_id, %message, "Variant could not be applied");
                self.services.notifier.notify(&message, Severity::Danger);
            }
        }
    }

    async fn call<T, F>(&self, call: F) -> ScanResult<T>
    where
        F: Future<Output = Result<T, ResolverError>>,
    {
        match tokio::time::timeout(self.settings.resolve_timeout(), call).await {
            Ok(result) => result.map_err(ScanError::from),
            Err(_) => Err(ResolverError::Timeout(self.settings.resolve_timeout_ms).into()),
        }
    }

    fn dismissed(&self, ticket: ScanTicket, candidates: Vec<VariantCandidate>, reopens_left: u32) {
        let scan_id = ticket.scan.id;

        if !ticket.liveness.is_live() {
            return;
        }

        if reopens_left == 0 {
            info!(%scan_id, "Variant choice dismissed");
            return;
        }

        info!(%scan_id, reopens_left, "Variant choice dismissed, can be reopened");
        self.choices.park(DeferredChoice {
            ticket,
            candidates,
            reopens_left,
        });
    }

    /// Reopens a dismissed choice. Never called by the engine itself.
    pub fn reopen(self: &Arc<Self>, scan_id: Uuid) -> ScanResult<()> {
        let choice = self
            .choices
            .take(scan_id)
            .filter(|c| c.ticket.liveness.is_live())
            .ok_or(ScanError::ChoiceNotPending(scan_id))?;

        info!(%scan_id, "Reopening variant choice");
        self.open_picker(
            choice.ticket,
            choice.candidates,
            choice.reopens_left.saturating_sub(1),
        );
        Ok(())
    }

    pub fn pending_choices(&self) -> Vec<PendingChoice> {
        self.choices.list()
    }

    pub fn clear_choices(&self) {
        self.choices.clear();
    }
}
