//! # Coordinator Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Coordinator State Machine                           │
//! │                                                                         │
//! │   ┌─────────────┐  activate   ┌─────────────┐  screen ready ┌──────────┐│
//! │   │ Uninstalled │────────────►│  Watching   │──────────────►│ Attached ││
//! │   └─────────────┘             │ {generation}│               │{generat.}││
//! │          ▲                    └──────┬──────┘               └────┬─────┘│
//! │          │  teardown / screen never appeared                    │      │
//! │          └──────────────────────────┴────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each activation gets a fresh generation. Sinks, resolution tasks and
//! variant choices remember the generation they were born in and go quiet
//! once it is no longer current.

use serde::Serialize;
use tokio::sync::watch;

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No listeners, no registration.
    #[default]
    Uninstalled,

    /// Activated, waiting for the receiving screen.
    Watching { generation: u64 },

    /// Listeners attached to the receiving screen.
    Attached { generation: u64 },
}

impl CoordinatorState {
    /// The live generation, if installed.
    pub fn generation(&self) -> Option<u64> {
        match self {
            CoordinatorState::Uninstalled => None,
            CoordinatorState::Watching { generation } | CoordinatorState::Attached { generation } => {
                Some(*generation)
            }
        }
    }

    /// Returns true while watching or attached.
    pub fn is_installed(&self) -> bool {
        self.generation().is_some()
    }

    /// Returns true once listeners are attached.
    pub fn is_attached(&self) -> bool {
        matches!(self, CoordinatorState::Attached { .. })
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Uninstalled => write!(f, "uninstalled"),
            CoordinatorState::Watching { generation } => write!(f, "watching (#{})", generation),
            CoordinatorState::Attached { generation } => write!(f, "attached (#{})", generation),
        }
    }
}

/// Answers "is my activation still current?" without holding any lock.
#[derive(Debug, Clone)]
pub(crate) struct Liveness {
    state: watch::Receiver<CoordinatorState>,
    generation: u64,
}

impl Liveness {
    pub fn new(state: watch::Receiver<CoordinatorState>, generation: u64) -> Self {
        Liveness { state, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.state.borrow().generation() == Some(self.generation)
    }

    /// Resolves once this generation has been retired.
    pub async fn retired(&mut self) {
        let generation = self.generation;
        // Err means the coordinator itself is gone, which retires everything.
        let _ = self
            .state
            .wait_for(|state| state.generation() != Some(generation))
            .await;
    }
}
