//! Test doubles shared by the engine's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;

use dock_core::{
    ConfirmOutcome, PickingContext, ResolutionOutcome, ScanSource, Severity, VariantCandidate,
};

use crate::coalesce::Gesture;
use crate::config::ScanConfig;
use crate::coordinator::ScanCoordinator;
use crate::error::{ResolverError, ScanResult};
use crate::protocol::{ConfirmRequest, ResolveRequest};
use crate::resolution::VariantSelection;
use crate::services::{ContextProvider, InventoryResolver, Notifier, ScanServices, VariantPicker};
use crate::surface::{Claim, DefaultHandler, ReleasedScan, ScanSink, ScanSurface};

// =============================================================================
// Resolver
// =============================================================================

/// Answers from a script, `Ok` once the script runs out.
#[derive(Default)]
pub struct RecordingResolver {
    outcomes: Mutex<VecDeque<Result<ResolutionOutcome, ResolverError>>>,
    confirms: Mutex<VecDeque<Result<ConfirmOutcome, ResolverError>>>,
    resolve_requests: Mutex<Vec<ResolveRequest>>,
    confirm_requests: Mutex<Vec<ConfirmRequest>>,
    gate: Option<Semaphore>,
    stall: bool,
}

impl RecordingResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every resolve call waits for [`open_gate`](Self::open_gate).
    pub fn gated() -> Arc<Self> {
        Arc::new(RecordingResolver {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    /// Every call hangs forever.
    pub fn stalled() -> Arc<Self> {
        Arc::new(RecordingResolver {
            stall: true,
            ..Self::default()
        })
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn push_outcome(&self, outcome: ResolutionOutcome) {
        self.outcomes.lock().unwrap().push_back(Ok(outcome));
    }

    pub fn push_fault(&self, fault: ResolverError) {
        self.outcomes.lock().unwrap().push_back(Err(fault));
    }

    pub fn push_confirm(&self, outcome: ConfirmOutcome) {
        self.confirms.lock().unwrap().push_back(Ok(outcome));
    }

    pub fn resolve_requests(&self) -> Vec<ResolveRequest> {
        self.resolve_requests.lock().unwrap().clone()
    }

    pub fn confirm_requests(&self) -> Vec<ConfirmRequest> {
        self.confirm_requests.lock().unwrap().clone()
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
    }
}

impl InventoryResolver for RecordingResolver {
    fn resolve_identifiers(
        &self,
        request: ResolveRequest,
    ) -> BoxFuture<'_, Result<ResolutionOutcome, ResolverError>> {
        Box::pin(async move {
            self.resolve_requests.lock().unwrap().push(request);
            self.hold().await;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(ResolutionOutcome::Ok { message: None }))
        })
    }

    fn confirm_variant(
        &self,
        request: ConfirmRequest,
    ) -> BoxFuture<'_, Result<ConfirmOutcome, ResolverError>> {
        Box::pin(async move {
            self.confirm_requests.lock().unwrap().push(request);
            if self.stall {
                std::future::pending::<()>().await;
            }
            self.confirms
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(ConfirmOutcome::Ok { message: None }))
        })
    }
}

// =============================================================================
// Notifier, Picker, Context
// =============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PickerAction {
    Select(i64),
    Dismiss,
    Hold,
}

/// Acts out one scripted action per open, dismissing once the script runs out.
#[derive(Default)]
pub struct ScriptedPicker {
    script: Mutex<VecDeque<PickerAction>>,
    opened: Mutex<Vec<Vec<VariantCandidate>>>,
    held: Mutex<Vec<VariantSelection>>,
}

impl ScriptedPicker {
    pub fn script(&self, action: PickerAction) {
        self.script.lock().unwrap().push_back(action);
    }

    pub fn opened(&self) -> Vec<Vec<VariantCandidate>> {
        self.opened.lock().unwrap().clone()
    }

    pub fn take_held(&self) -> Option<VariantSelection> {
        self.held.lock().unwrap().pop()
    }
}

impl VariantPicker for ScriptedPicker {
    fn open(&self, candidates: Vec<VariantCandidate>, on_select: VariantSelection) {
        self.opened.lock().unwrap().push(candidates);
        let action = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PickerAction::Dismiss);

        match action {
            PickerAction::Select(id) => {
                let _ = on_select.select(id);
            }
            PickerAction::Dismiss => on_select.dismiss(),
            PickerAction::Hold => self.held.lock().unwrap().push(on_select),
        }
    }
}

#[derive(Default)]
pub struct SharedContext {
    current: Mutex<PickingContext>,
}

impl SharedContext {
    pub fn set(&self, context: PickingContext) {
        *self.current.lock().unwrap() = context;
    }
}

impl ContextProvider for SharedContext {
    fn current_picking_context(&self) -> PickingContext {
        *self.current.lock().unwrap()
    }
}

// =============================================================================
// Manual Surface
// =============================================================================

/// A surface the test drives by hand.
pub struct ManualSurface {
    source: ScanSource,
    shared: Arc<ManualShared>,
}

#[derive(Default)]
struct ManualShared {
    sink: Mutex<Option<ScanSink>>,
    released: Mutex<Vec<ReleasedScan>>,
    attaches: Mutex<usize>,
}

/// The test's side of a [`ManualSurface`].
#[derive(Clone)]
pub struct ManualHandle {
    shared: Arc<ManualShared>,
}

impl ManualSurface {
    pub fn new(source: ScanSource) -> (Self, ManualHandle) {
        let shared = Arc::new(ManualShared::default());
        (
            ManualSurface {
                source,
                shared: Arc::clone(&shared),
            },
            ManualHandle { shared },
        )
    }
}

impl ScanSurface for ManualSurface {
    fn source(&self) -> ScanSource {
        self.source
    }

    fn default_handler(&self) -> Arc<dyn DefaultHandler> {
        let shared = Arc::clone(&self.shared);
        Arc::new(move |scan: ReleasedScan| shared.released.lock().unwrap().push(scan))
    }

    fn attach(&mut self, sink: ScanSink) -> ScanResult<()> {
        *self.shared.sink.lock().unwrap() = Some(sink);
        *self.shared.attaches.lock().unwrap() += 1;
        Ok(())
    }

    fn detach(&mut self) {
        self.shared.sink.lock().unwrap().take();
    }
}

impl ManualHandle {
    /// Captures a scan. Declined when nothing is attached.
    pub fn scan(&self, raw: &str) -> Claim {
        match self.shared.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.offer(raw),
            None => Claim::Declined,
        }
    }

    /// Reports one notification of a physical scan.
    pub fn notify(&self, raw: &str, gesture: Gesture) -> Claim {
        match self.shared.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.offer_notification(raw, gesture),
            None => Claim::Declined,
        }
    }

    pub fn released(&self) -> Vec<ReleasedScan> {
        self.shared.released.lock().unwrap().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.shared.sink.lock().unwrap().is_some()
    }

    pub fn attach_count(&self) -> usize {
        *self.shared.attaches.lock().unwrap()
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A coordinator wired to recording doubles.
pub struct Harness {
    pub coordinator: ScanCoordinator,
    pub resolver: Arc<RecordingResolver>,
    pub notifier: Arc<RecordingNotifier>,
    pub picker: Arc<ScriptedPicker>,
    pub context: Arc<SharedContext>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default(), RecordingResolver::new())
    }

    pub fn with_resolver(resolver: Arc<RecordingResolver>) -> Self {
        Self::with_config(ScanConfig::default(), resolver)
    }

    pub fn with_config(config: ScanConfig, resolver: Arc<RecordingResolver>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let picker = Arc::new(ScriptedPicker::default());
        let context = Arc::new(SharedContext::default());

        let services = ScanServices::new(resolver.clone(), context.clone())
            .with_notifier(notifier.clone())
            .with_picker(picker.clone());
        let coordinator = ScanCoordinator::new(&config, services).unwrap();

        Harness {
            coordinator,
            resolver,
            notifier,
            picker,
            context,
        }
    }

    /// Services with silent feedback, for tests that never reach a runtime.
    pub fn services(resolver: Arc<RecordingResolver>) -> ScanServices {
        ScanServices::new(resolver, Arc::new(SharedContext::default()))
    }
}
