//! # Bonding Protocol
//!
//! The synchronization objects every worker shares, bundled into one
//! [`Protocol`] value held behind an `Arc`.
//!
//! ```text
//! ┌──────────────────────────── Protocol ────────────────────────────┐
//! │  SharedState        counters behind one lock                     │
//! │  EventLog           numbered output lines                        │
//! │  PairingGate        arrive ─> match 1 O + 2 H ─> molecule id     │
//! │  AssemblyBarrier    creating ─> bond ─> created ─> release       │
//! │  ShutdownCoordinator  last molecule staged ─> flush stranded     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod barrier;
mod gate;
mod shutdown;

pub use barrier::AssemblyBarrier;
pub use gate::{Admission, PairingGate};
pub use shutdown::ShutdownCoordinator;

use tracing::warn;

use crate::config::SupplyPlan;
use crate::log::EventLog;
use crate::state::SharedState;

/// Shared state of one simulation run.
#[derive(Debug)]
pub struct Protocol {
    /// Counters guarded by the single state lock.
    pub state: SharedState,
    /// Output log.
    pub log: EventLog,
    /// Triple matching.
    pub gate: PairingGate,
    /// Group assembly.
    pub barrier: AssemblyBarrier,
    /// Exhaustion detection.
    pub shutdown: ShutdownCoordinator,
}

impl Protocol {
    /// Creates fresh protocol state for `plan` writing to `log`.
    #[must_use]
    pub fn new(plan: SupplyPlan, log: EventLog) -> Self {
        Self {
            state: SharedState::new(),
            log,
            gate: PairingGate::new(),
            barrier: AssemblyBarrier::new(),
            shutdown: ShutdownCoordinator::new(plan),
        }
    }

    /// Flushes the queues up front if no molecule can ever form.
    pub fn prime(&self) -> bool {
        self.shutdown.prime(&self.state, &self.gate)
    }

    /// Tears the run down: every blocked or future wait fails with
    /// [`crate::SimulationError::Aborted`]. Idempotent.
    pub fn abort(&self) {
        if !self.gate.is_closed() {
            warn!("aborting simulation, waking all blocked workers");
        }
        self.gate.close();
        self.barrier.close();
    }

    /// Returns true once [`Protocol::abort`] has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.gate.is_closed()
    }
}
