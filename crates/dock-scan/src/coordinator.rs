//! # Scan Interception Coordinator
//!
//! One coordinator owns every input surface of the receiving screen and makes
//! sure each physical scan is interpreted exactly once.
//!
//! ## Coordinator Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       ScanCoordinator                                   │
//! │                                                                         │
//! │  activate(screen_ready)                                                │
//! │       │ check-then-set Uninstalled → Watching{g}                       │
//! │       ▼                                                                 │
//! │  ┌──────────────── activation task (generation g) ──────────────────┐  │
//! │  │ await screen_ready  ◄── or teardown                              │  │
//! │  │ attach every surface with its own ScanSink ─► Attached{g}        │  │
//! │  │                                                                  │  │
//! │  │ dispatch loop:                                                   │  │
//! │  │   recv in arrival order                                          │  │
//! │  │   collapse repeats tagged with the same gesture                  │  │
//! │  │   identify ── not ours ──► release to the surface's default      │  │
//! │  │      │                                                           │  │
//! │  │      └── identifiers ──► ResolutionClient (spawned, one call)    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  teardown(): Uninstalled, detach all surfaces, drop parked choices,    │
//! │              release anything still queued                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - The registration is explicit state on this instance, so independent
//!   coordinators never see each other
//! - Claiming happens inside [`ScanSink::offer`] before any suspension point
//! - Unrecognized scans are released exactly once and never seen again
//! - Scans are considered in arrival order; their resolutions may finish in
//!   any order

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use dock_core::identify_with;

use crate::coalesce::NotificationFilter;
use crate::config::{ScanConfig, ScanSettings};
use crate::error::{ScanError, ScanResult};
use crate::lifecycle::{CoordinatorState, Liveness};
use crate::resolution::{PendingChoice, ResolutionClient, ScanTicket};
use crate::services::ScanServices;
use crate::stats::{Activity, ScanStats, StatsCounters};
use crate::surface::{QueuedScan, ReceivingScreen, ScanSink, ScanSurface};

// =============================================================================
// Scan Coordinator
// =============================================================================

/// Handle to a scan coordinator. Clones share the same coordinator.
#[derive(Clone)]
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    settings: ScanSettings,
    runtime: Handle,
    state: watch::Sender<CoordinatorState>,
    generations: AtomicU64,
    surfaces: Mutex<Vec<Box<dyn ScanSurface>>>,
    activity: Arc<Activity>,
    stats: Arc<StatsCounters>,
    client: Arc<ResolutionClient>,
}

impl ScanCoordinator {
    /// Creates an uninstalled coordinator on the current tokio runtime.
    pub fn new(config: &ScanConfig, services: ScanServices) -> ScanResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;

        let activity = Arc::new(Activity::default());
        let stats = Arc::new(StatsCounters::default());
        let client = Arc::new(ResolutionClient::new(
            services,
            config.scan.clone(),
            config.messages.clone(),
            runtime.clone(),
            Arc::clone(&activity),
            Arc::clone(&stats),
        ));
        let (state, _) = watch::channel(CoordinatorState::Uninstalled);

        Ok(ScanCoordinator {
            inner: Arc::new(Inner {
                settings: config.scan.clone(),
                runtime,
                state,
                generations: AtomicU64::new(0),
                surfaces: Mutex::new(Vec::new()),
                activity,
                stats,
                client,
            }),
        })
    }

    /// Starts watching for the receiving screen.
    ///
    /// `screen_ready` resolves to the screen once it exists, or to `None` if
    /// it never will (navigation went elsewhere). A second activation while
    /// watching or attached is rejected and leaves the current one intact.
    pub fn activate<F>(&self, screen_ready: F) -> ScanResult<()>
    where
        F: Future<Output = Option<ReceivingScreen>> + Send + 'static,
    {
        let mut installed = None;
        self.inner.state.send_if_modified(|state| {
            if state.is_installed() {
                return false;
            }
            let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
            *state = CoordinatorState::Watching { generation };
            installed = Some(generation);
            true
        });

        let Some(generation) = installed else {
            warn!(state = %self.state(), "Rejected second activation");
            return Err(ScanError::AlreadyInstalled);
        };

        info!(generation, "Watching for receiving screen");
        let inner = Arc::clone(&self.inner);
        self.inner
            .runtime
            .spawn(inner.run_activation(generation, screen_ready));
        Ok(())
    }

    /// Activates with a screen that is already present.
    pub fn activate_with(&self, screen: ReceivingScreen) -> ScanResult<()> {
        self.activate(async move { Some(screen) })
    }

    /// Detaches every surface and clears the registration.
    ///
    /// Synchronous. Resolutions already in flight finish, but their outcomes
    /// are dropped. Scans claimed but not yet considered are released.
    pub fn teardown(&self) {
        let previous = self.inner.state.send_replace(CoordinatorState::Uninstalled);

        let detached = {
            let mut surfaces = self.inner.lock_surfaces();
            for surface in surfaces.iter_mut() {
                surface.detach();
            }
            let count = surfaces.len();
            surfaces.clear();
            count
        };
        self.inner.client.clear_choices();

        match previous.generation() {
            Some(generation) => info!(generation, detached, "Scan coordinator torn down"),
            None => debug!("Teardown while uninstalled"),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    /// Waits until watching ends. True if the screen was attached.
    pub async fn attached(&self) -> bool {
        let mut state = self.inner.state.subscribe();
        let attached = state
            .wait_for(|s| !matches!(s, CoordinatorState::Watching { .. }))
            .await
            .map(|s| s.is_attached())
            .unwrap_or(false);
        attached
    }

    /// Waits until every claimed scan was released or fully resolved,
    /// including confirmations already sent.
    pub async fn settle(&self) {
        self.inner.activity.wait_idle().await;
    }

    /// Snapshot of the scan counters.
    pub fn stats(&self) -> ScanStats {
        self.inner.stats.snapshot()
    }

    /// Dismissed variant choices that can be reopened.
    pub fn pending_choices(&self) -> Vec<PendingChoice> {
        self.inner.client.pending_choices()
    }

    /// Reopens the variant picker for a dismissed choice.
    pub fn reopen_choice(&self, scan_id: Uuid) -> ScanResult<()> {
        self.inner.client.reopen(scan_id)
    }
}

impl std::fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Activation Task
// =============================================================================

impl Inner {
    fn lock_surfaces(&self) -> MutexGuard<'_, Vec<Box<dyn ScanSurface>>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn liveness(&self, generation: u64) -> Liveness {
        Liveness::new(self.state.subscribe(), generation)
    }

    async fn run_activation<F>(self: Arc<Self>, generation: u64, screen_ready: F)
    where
        F: Future<Output = Option<ReceivingScreen>>,
    {
        let mut liveness = self.liveness(generation);

        let screen = tokio::select! {
            screen = screen_ready => screen,
            _ = liveness.retired() => {
                debug!(generation, "Torn down while watching");
                return;
            }
        };

        let Some(screen) = screen else {
            self.state.send_if_modified(|state| {
                if *state == (CoordinatorState::Watching { generation }) {
                    *state = CoordinatorState::Uninstalled;
                    true
                } else {
                    false
                }
            });
            info!(generation, "Receiving screen never appeared");
            return;
        };

        if let Some(queue) = self.attach(generation, screen) {
            self.dispatch(generation, queue).await;
        }
    }

    fn attach(
        &self,
        generation: u64,
        screen: ReceivingScreen,
    ) -> Option<mpsc::UnboundedReceiver<QueuedScan>> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut attached = self.lock_surfaces();
        if !self.liveness(generation).is_live() {
            return None;
        }

        for mut surface in screen.surfaces {
            let source = surface.source();
            let sink = ScanSink::new(
                source,
                self.liveness(generation),
                tx.clone(),
                surface.default_handler(),
                Arc::clone(&self.activity),
                Arc::clone(&self.stats),
            );
            match surface.attach(sink) {
                Ok(()) => {
                    debug!(%source, generation, "Surface attached");
                    attached.push(surface);
                }
                Err(e) => warn!(%source, error = %e, "Surface failed to attach"),
            }
        }

        let surfaces = attached.len();
        let promoted = self.state.send_if_modified(|state| {
            if *state == (CoordinatorState::Watching { generation }) {
                *state = CoordinatorState::Attached { generation };
                true
            } else {
                false
            }
        });
        drop(attached);

        if !promoted {
            // Teardown raced us and will detach what we attached.
            return None;
        }

        info!(generation, surfaces, "Attached to receiving screen");
        Some(rx)
    }

    // =========================================================================
    // Dispatch Loop
    // =========================================================================

    async fn dispatch(&self, generation: u64, mut queue: mpsc::UnboundedReceiver<QueuedScan>) {
        let mut liveness = self.liveness(generation);

        let mut filter = NotificationFilter::default();

        loop {
            let queued = tokio::select! {
                biased;
                queued = queue.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
                _ = liveness.retired() => break,
            };

            if !filter.admit(queued.gesture, &queued.event.raw_text) {
                // Another notification of a scan already considered
                StatsCounters::bump(&self.stats.coalesced);
                trace!(scan_id = %queued.event.id, "Repeated notification coalesced");
                continue;
            }

            self.consider(queued, &liveness);
        }

        queue.close();
        let mut released = 0usize;
        while let Ok(queued) = queue.try_recv() {
            StatsCounters::bump(&self.stats.released);
            queued.release();
            released += 1;
        }
        if released > 0 {
            info!(generation, released, "Released scans queued at teardown");
        }
        debug!(generation, "Dispatcher stopped");
    }

    fn consider(&self, queued: QueuedScan, liveness: &Liveness) {
        let scan_id = queued.event.id;
        let source = queued.event.source;

        if !liveness.is_live() {
            StatsCounters::bump(&self.stats.released);
            debug!(%scan_id, %source, "Coordinator torn down, scan released");
            queued.release();
            return;
        }

        match identify_with(&queued.event.raw_text, self.settings.normalize_options()) {
            Err(reason) => {
                StatsCounters::bump(&self.stats.released);
                debug!(%scan_id, %source, %reason, "Not a recognized identifier, scan released");
                queued.release();
            }
            Ok(identifiers) => {
                StatsCounters::bump(&self.stats.accepted);
                debug!(%scan_id, %source, gtin = ?identifiers.gtin(), "Scan accepted");
                let QueuedScan { event, guard, .. } = queued;
                let ticket = ScanTicket {
                    scan: event,
                    identifiers,
                    liveness: liveness.clone(),
                };
                self.client.spawn_resolve(ticket, guard);
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
