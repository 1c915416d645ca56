//! # Shutdown Coordinator
//!
//! Detects that the last formable molecule has been staged and flushes the
//! units that can never be matched.
//!
//! The false → true transition of `supply_exhausted` and the flush happen
//! inside one critical section on the shared counters, so concurrent callers
//! flush exactly once.

use tracing::info;

use crate::config::SupplyPlan;
use crate::protocol::gate::PairingGate;
use crate::state::{Counters, SharedState};
use crate::unit::MoleculeId;

/// Owns the supply plan and performs the one-time exhaustion flush.
#[derive(Clone, Copy, Debug)]
pub struct ShutdownCoordinator {
    plan: SupplyPlan,
}

impl ShutdownCoordinator {
    /// Creates a coordinator for `plan`.
    #[must_use]
    pub const fn new(plan: SupplyPlan) -> Self {
        Self { plan }
    }

    /// Runs the exhaustion check before any unit arrives.
    ///
    /// Only acts when no molecule can be formed at all. Returns true if the
    /// flush happened.
    pub fn prime(&self, state: &SharedState, gate: &PairingGate) -> bool {
        if self.plan.molecules_target == 0 {
            self.on_staged(state, gate, 0)
        } else {
            false
        }
    }

    /// Exhaustion check for a fully staged molecule. Locks the counters.
    pub fn on_staged(&self, state: &SharedState, gate: &PairingGate, molecule: MoleculeId) -> bool {
        let mut counters = state.lock();
        self.on_staged_locked(&mut counters, gate, molecule)
    }

    /// Exhaustion check for callers already holding the counter lock.
    ///
    /// Returns true if this call set the flag and flushed the queues.
    pub fn on_staged_locked(
        &self,
        counters: &mut Counters,
        gate: &PairingGate,
        molecule: MoleculeId,
    ) -> bool {
        if molecule != self.plan.molecules_target || counters.supply_exhausted {
            return false;
        }
        counters.supply_exhausted = true;

        let oxygen = self.plan.oxygen_stranded();
        let hydrogen = self.plan.hydrogen_stranded();
        gate.flush(oxygen, hydrogen);

        info!(
            molecule,
            stranded_oxygen = oxygen,
            stranded_hydrogen = hydrogen,
            "supply exhausted, flushing queues"
        );
        true
    }
}
