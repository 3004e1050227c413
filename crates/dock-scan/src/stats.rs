//! # Engine Bookkeeping
//!
//! Scan counters and the in-flight work tracker behind
//! [`ScanCoordinator::settle`](crate::ScanCoordinator::settle).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Notify;

// =============================================================================
// Scan Stats
// =============================================================================

/// Snapshot of the coordinator's counters.
///
/// ## Accounting
/// ```text
/// offered ─┬─ declined (not attached)
///          └─ claimed ─┬─ coalesced (repeat of a gesture)
///                      ├─ released  (not ours, or torn down while queued)
///                      └─ accepted ─┬─ applied
///                                   ├─ awaiting_choice ── confirmations
///                                   └─ failed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub offered: u64,
    pub claimed: u64,
    pub coalesced: u64,
    pub released: u64,
    pub accepted: u64,
    pub applied: u64,
    pub awaiting_choice: u64,
    pub failed: u64,
    pub confirmations: u64,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "offered={} claimed={} coalesced={} released={} accepted={} applied={} \
             awaiting_choice={} failed={} confirmations={}",
            self.offered,
            self.claimed,
            self.coalesced,
            self.released,
            self.accepted,
            self.applied,
            self.awaiting_choice,
            self.failed,
            self.confirmations
        )
    }
}

/// Live counters shared by sinks, the dispatcher and resolution tasks.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub offered: AtomicU64,
    pub claimed: AtomicU64,
    pub coalesced: AtomicU64,
    pub released: AtomicU64,
    pub accepted: AtomicU64,
    pub applied: AtomicU64,
    pub awaiting_choice: AtomicU64,
    pub failed: AtomicU64,
    pub confirmations: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ScanStats {
            offered: load(&self.offered),
            claimed: load(&self.claimed),
            coalesced: load(&self.coalesced),
            released: load(&self.released),
            accepted: load(&self.accepted),
            applied: load(&self.applied),
            awaiting_choice: load(&self.awaiting_choice),
            failed: load(&self.failed),
            confirmations: load(&self.confirmations),
        }
    }
}

// =============================================================================
// Activity Tracker
// =============================================================================

/// Counts queued scans and running resolver calls.
#[derive(Debug, Default)]
pub(crate) struct Activity {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Activity {
    /// Marks one unit of work as started until the guard drops.
    pub fn begin(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            activity: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until no work is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps its unit of work counted while alive.
#[derive(Debug)]
pub(crate) struct ActivityGuard {
    activity: Arc<Activity>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        if self.activity.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.activity.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_returns_when_guards_drop() {
        let activity = Arc::new(Activity::default());
        let first = activity.begin();
        let second = activity.begin();
        assert_eq!(activity.in_flight(), 2);

        let waiter = {
            let activity = Arc::clone(&activity);
            tokio::spawn(async move { activity.wait_idle().await })
        };

        drop(first);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_idle_with_nothing_in_flight() {
        Activity::default().wait_idle().await;
    }

    #[test]
    fn test_snapshot() {
        let counters = StatsCounters::default();
        StatsCounters::bump(&counters.offered);
        StatsCounters::bump(&counters.offered);
        StatsCounters::bump(&counters.claimed);
        let stats = counters.snapshot();
        assert_eq!(stats.offered, 2);
        assert_eq!(stats.claimed, 1);
        assert!(stats.to_string().starts_with("offered=2 claimed=1"));
    }
}
