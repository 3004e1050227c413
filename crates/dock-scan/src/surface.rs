//! # Input Surfaces
//!
//! An input surface is one place a physical scan can show up: the event bus,
//! global key capture, an input field. The coordinator owns a set of them and
//! hands each a [`ScanSink`] when the receiving screen appears.
//!
//! ## Ownership Handshake
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Physical Scan                                    │
//! │                                                                         │
//! │  surface captures raw text                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sink.offer(raw) ─── synchronous, before any await ───┐                │
//! │       │                                               │                │
//! │       ├── Claim::Owned(id)   surface suppresses its   │                │
//! │       │                      default handling         │                │
//! │       │                                               ▼                │
//! │       │                                     coordinator queue          │
//! │       │                                          │                     │
//! │       │                     not ours ◄───────────┤                     │
//! │       │                        │                 └──► resolution       │
//! │       │                        ▼                                       │
//! │       │          DefaultHandler::handle_released(ReleasedScan)         │
//! │       │                                                                 │
//! │       └── Claim::Declined    surface lets its default handling run     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`ReleasedScan`] can only be built by this crate and no sink accepts one,
//! so a released scan can never loop back into the coordinator.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use dock_core::{ScanEvent, ScanSource};

use crate::coalesce::Gesture;
use crate::error::ScanResult;
use crate::lifecycle::Liveness;
use crate::stats::{Activity, ActivityGuard, StatsCounters};

// =============================================================================
// Claim
// =============================================================================

/// Answer to [`ScanSink::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The coordinator owns the scan. Suppress default handling.
    Owned(Uuid),
    /// The coordinator is not taking scans. Let default handling run.
    Declined,
}

impl Claim {
    pub fn is_owned(&self) -> bool {
        matches!(self, Claim::Owned(_))
    }
}

// =============================================================================
// Released Scan
// =============================================================================

/// A claimed scan handed back for default handling.
///
/// Carries the original event so the default handler sees exactly what was
/// captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedScan {
    event: ScanEvent,
}

impl ReleasedScan {
    pub(crate) fn new(event: ScanEvent) -> Self {
        ReleasedScan { event }
    }

    pub fn scan_id(&self) -> Uuid {
        self.event.id
    }

    pub fn raw_text(&self) -> &str {
        &self.event.raw_text
    }

    pub fn source(&self) -> ScanSource {
        self.event.source
    }

    pub fn into_event(self) -> ScanEvent {
        self.event
    }
}

/// Whatever handled scans on a surface before the coordinator attached.
pub trait DefaultHandler: Send + Sync {
    fn handle_released(&self, scan: ReleasedScan);
}

impl<F> DefaultHandler for F
where
    F: Fn(ReleasedScan) + Send + Sync,
{
    fn handle_released(&self, scan: ReleasedScan) {
        self(scan)
    }
}

// =============================================================================
// Surface Trait
// =============================================================================

/// One attachment strategy.
pub trait ScanSurface: Send {
    /// Which kind of surface this is.
    fn source(&self) -> ScanSource;

    /// Receives scans the coordinator claimed and then released.
    fn default_handler(&self) -> Arc<dyn DefaultHandler>;

    /// Starts listening. Every captured scan goes through `sink.offer`.
    fn attach(&mut self, sink: ScanSink) -> ScanResult<()>;

    /// Stops listening and drops the sink.
    fn detach(&mut self);
}

/// The receiving screen, as it becomes available.
pub struct ReceivingScreen {
    pub(crate) surfaces: Vec<Box<dyn ScanSurface>>,
}

impl ReceivingScreen {
    pub fn new() -> Self {
        ReceivingScreen {
            surfaces: Vec::new(),
        }
    }

    /// Adds a surface to attach when the screen is ready.
    pub fn with_surface(mut self, surface: impl ScanSurface + 'static) -> Self {
        self.surfaces.push(Box::new(surface));
        self
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Default for ReceivingScreen {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Scan Sink
// =============================================================================

/// A claimed scan waiting for the dispatcher.
pub(crate) struct QueuedScan {
    pub event: ScanEvent,
    pub gesture: Option<Gesture>,
    pub handler: Arc<dyn DefaultHandler>,
    pub guard: ActivityGuard,
}

impl QueuedScan {
    pub fn release(self) {
        let QueuedScan { event, handler, .. } = self;
        handler.handle_released(ReleasedScan::new(event));
    }
}

/// A surface's connection to the coordinator.
#[derive(Clone)]
pub struct ScanSink {
    source: ScanSource,
    liveness: Liveness,
    queue: mpsc::UnboundedSender<QueuedScan>,
    handler: Arc<dyn DefaultHandler>,
    activity: Arc<Activity>,
    stats: Arc<StatsCounters>,
}

impl ScanSink {
    pub(crate) fn new(
        source: ScanSource,
        liveness: Liveness,
        queue: mpsc::UnboundedSender<QueuedScan>,
        handler: Arc<dyn DefaultHandler>,
        activity: Arc<Activity>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        ScanSink {
            source,
            liveness,
            queue,
            handler,
            activity,
            stats,
        }
    }

    pub fn source(&self) -> ScanSource {
        self.source
    }

    /// Returns true while the coordinator takes scans from this sink.
    pub fn is_open(&self) -> bool {
        self.liveness.is_live() && !self.queue.is_closed()
    }

    /// Offers a captured physical scan. Never blocks, never suspends.
    ///
    /// Every call is its own scan, even when the text repeats. Blank text is
    /// declined: there is nothing to interpret.
    pub fn offer(&self, raw_text: impl Into<String>) -> Claim {
        self.enqueue(raw_text.into(), None)
    }

    /// Offers one notification of a physical scan the surface may report
    /// more than once.
    ///
    /// Notifications sharing `gesture` and text are interpreted once; the
    /// repeats are still owned, so the surface suppresses their default
    /// handling.
    pub fn offer_notification(&self, raw_text: impl Into<String>, gesture: Gesture) -> Claim {
        self.enqueue(raw_text.into(), Some(gesture))
    }

    fn enqueue(&self, raw_text: String, gesture: Option<Gesture>) -> Claim {
        StatsCounters::bump(&self.stats.offered);

        if raw_text.trim().is_empty() || !self.liveness.is_live() {
            return Claim::Declined;
        }

        let event = ScanEvent::new(raw_text, self.source);
        let id = event.id;
        let queued = QueuedScan {
            event,
            gesture,
            handler: Arc::clone(&self.handler),
            guard: self.activity.begin(),
        };

        match self.queue.send(queued) {
            Ok(()) => {
                StatsCounters::bump(&self.stats.claimed);
                trace!(
                    scan_id = %id,
                    source = %self.source,
                    tagged = gesture.is_some(),
                    "Scan claimed"
                );
                Claim::Owned(id)
            }
            Err(_) => Claim::Declined,
        }
    }
}

impl std::fmt::Debug for ScanSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSink")
            .field("source", &self.source)
            .field("generation", &self.liveness.generation())
            .finish_non_exhaustive()
    }
}
