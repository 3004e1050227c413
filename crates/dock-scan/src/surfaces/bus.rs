//! # Scan Bus
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ScanBus relay                                  │
//! │                                                                         │
//! │  publish(raw) ──► upstream ──► relay task                              │
//! │                                   │                                     │
//! │                 no sink attached ─┼─► downstream (default handling)    │
//! │                 Claim::Declined ──┤                                     │
//! │                 Claim::Owned ─────┴─► coordinator                      │
//! │                                          │ released                     │
//! │                                          └──────► downstream           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The bus belongs to the host and outlives any coordinator attachment, so
//! default handling keeps working before activation and after teardown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use dock_core::ScanSource;

use crate::error::{ScanError, ScanResult};
use crate::surface::{Claim, DefaultHandler, ReleasedScan, ScanSink, ScanSurface};

type SinkSlot = Arc<Mutex<Option<ScanSink>>>;

fn lock_slot(slot: &SinkSlot) -> MutexGuard<'_, Option<ScanSink>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host-owned scan bus with an interception point.
pub struct ScanBus {
    upstream: broadcast::Sender<String>,
    downstream: broadcast::Sender<String>,
    slot: SinkSlot,
    relay: JoinHandle<()>,
}

impl ScanBus {
    /// Starts the relay on the current runtime.
    pub fn spawn(capacity: usize) -> ScanResult<Self> {
        let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
        let capacity = capacity.max(1);

        let (upstream, events) = broadcast::channel(capacity);
        let (downstream, _) = broadcast::channel(capacity);
        let slot: SinkSlot = Arc::default();

        let relay = runtime.spawn(relay(events, Arc::clone(&slot), downstream.clone()));

        Ok(ScanBus {
            upstream,
            downstream,
            slot,
            relay,
        })
    }

    /// Publishes a raw scan. Returns false if the relay is gone.
    pub fn publish(&self, raw: impl Into<String>) -> bool {
        self.upstream.send(raw.into()).is_ok()
    }

    /// Subscribes to what reaches default handling.
    pub fn subscribe_default(&self) -> broadcast::Receiver<String> {
        self.downstream.subscribe()
    }

    /// Surface to hand to the coordinator.
    pub fn surface(&self) -> BusSurface {
        BusSurface {
            slot: Arc::clone(&self.slot),
            downstream: self.downstream.clone(),
        }
    }

    pub fn is_intercepted(&self) -> bool {
        lock_slot(&self.slot).is_some()
    }
}

impl Drop for ScanBus {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

async fn relay(
    mut events: broadcast::Receiver<String>,
    slot: SinkSlot,
    downstream: broadcast::Sender<String>,
) {
    loop {
        let raw = match events.recv().await {
            Ok(raw) => raw,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Scan bus lagged, scans lost");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let claim = match lock_slot(&slot).as_ref() {
            Some(sink) => sink.offer(raw.as_str()),
            None => Claim::Declined,
        };

        if claim == Claim::Declined {
            trace!("Bus scan passed through");
            let _ = downstream.send(raw);
        }
    }
}

/// The bus as seen by the coordinator.
pub struct BusSurface {
    slot: SinkSlot,
    downstream: broadcast::Sender<String>,
}

impl ScanSurface for BusSurface {
    fn source(&self) -> ScanSource {
        ScanSource::Bus
    }

    fn default_handler(&self) -> Arc<dyn DefaultHandler> {
        let downstream = self.downstream.clone();
        Arc::new(move |scan: ReleasedScan| {
            let _ = downstream.send(scan.into_event().raw_text);
        })
    }

    fn attach(&mut self, sink: ScanSink) -> ScanResult<()> {
        *lock_slot(&self.slot) = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        lock_slot(&self.slot).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ReceivingScreen;
    use crate::testing::Harness;

    const GS1: &str = "0112345678901231";

    async fn until(mut done: impl FnMut() -> bool) {
        while !done() {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_spawn_requires_runtime() {
        assert!(matches!(ScanBus::spawn(8), Err(ScanError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_passes_through_without_coordinator() {
        let bus = ScanBus::spawn(8).unwrap();
        let mut default = bus.subscribe_default();

        assert!(bus.publish(GS1));
        assert_eq!(default.recv().await.unwrap(), GS1);
    }

    #[tokio::test]
    async fn test_recognized_scan_is_intercepted() {
        let harness = Harness::new();
        let bus = ScanBus::spawn(8).unwrap();
        let mut default = bus.subscribe_default();
        harness
            .coordinator
            .activate_with(ReceivingScreen::new().with_surface(bus.surface()))
            .unwrap();
        assert!(harness.coordinator.attached().await);
        assert!(bus.is_intercepted());

        bus.publish(GS1);
        until(|| harness.coordinator.stats().claimed == 1).await;
        harness.coordinator.settle().await;

        assert_eq!(harness.resolver.resolve_requests().len(), 1);
        assert!(matches!(
            default.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_scan_reaches_default_once() {
        let harness = Harness::new();
        let bus = ScanBus::spawn(8).unwrap();
        let mut default = bus.subscribe_default();
        harness
            .coordinator
            .activate_with(ReceivingScreen::new().with_surface(bus.surface()))
            .unwrap();
        assert!(harness.coordinator.attached().await);

        bus.publish("LOC-A-01");
        assert_eq!(default.recv().await.unwrap(), "LOC-A-01");
        harness.coordinator.settle().await;

        assert!(matches!(
            default.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert!(harness.resolver.resolve_requests().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_bus_scans_each_reach_an_outcome() {
        let harness = Harness::new();
        let bus = ScanBus::spawn(8).unwrap();
        let mut default = bus.subscribe_default();
        harness
            .coordinator
            .activate_with(ReceivingScreen::new().with_surface(bus.surface()))
            .unwrap();
        assert!(harness.coordinator.attached().await);

        // Two physical scans of the same location label
        bus.publish("LOC-A-01");
        bus.publish("LOC-A-01");
        assert_eq!(default.recv().await.unwrap(), "LOC-A-01");
        assert_eq!(default.recv().await.unwrap(), "LOC-A-01");

        // Two physical scans of the same product
        bus.publish(GS1);
        bus.publish(GS1);
        until(|| harness.coordinator.stats().claimed == 4).await;
        harness.coordinator.settle().await;

        assert_eq!(harness.resolver.resolve_requests().len(), 2);
        assert_eq!(harness.coordinator.stats().coalesced, 0);
        assert!(matches!(
            default.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_teardown_restores_pass_through() {
        let harness = Harness::new();
        let bus = ScanBus::spawn(8).unwrap();
        let mut default = bus.subscribe_default();
        harness
            .coordinator
            .activate_with(ReceivingScreen::new().with_surface(bus.surface()))
            .unwrap();
        assert!(harness.coordinator.attached().await);

        harness.coordinator.teardown();
        assert!(!bus.is_intercepted());

        bus.publish(GS1);
        assert_eq!(default.recv().await.unwrap(), GS1);
        assert!(harness.resolver.resolve_requests().is_empty());
    }
}
