//! # Shared State
//!
//! The counters every worker reads and mutates. One instance per run, one
//! lock for all of them: several protocol steps must check and update more
//! than one counter as a single critical section (forming a match touches
//! both queue counts and the molecule id).
//!
//! ## Lock Discipline
//!
//! The counter lock is held only for check-and-update sequences. It is never
//! held across a blocking wait. Releasing a semaphore while holding it is
//! allowed, since a release never blocks.

use parking_lot::{Mutex, MutexGuard};

use crate::unit::{MoleculeId, Role, UnitId};

/// Plain counters guarded by [`SharedState`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Last oxygen identity handed out.
    pub oxygen_id: UnitId,
    /// Last hydrogen identity handed out.
    pub hydrogen_id: UnitId,
    /// Identity of the most recently matched molecule (0 before the first).
    pub molecule_id: MoleculeId,
    /// Oxygen units that requested pairing and were not consumed yet.
    pub oxygen_waiting: u32,
    /// Hydrogen units that requested pairing and were not consumed yet.
    pub hydrogen_waiting: u32,
    /// Oxygen units staged in front of the barrier release.
    pub barrier_oxygen_ready: u32,
    /// Hydrogen units staged in front of the barrier release.
    pub barrier_hydrogen_ready: u32,
    /// Units that announced `creating molecule` for the molecule in assembly.
    pub assembling_count: u32,
    /// Set once the last formable molecule has been staged. Never cleared.
    pub supply_exhausted: bool,
}

/// Run-wide shared state.
#[derive(Debug, Default)]
pub struct SharedState {
    counters: Mutex<Counters>,
}

impl SharedState {
    /// Creates zeroed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the counters for one critical section.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock()
    }

    /// Assigns the next identity for a unit of `role`. Identities start at 1.
    pub fn register(&self, role: Role) -> UnitId {
        let mut counters = self.lock();
        let slot = match role {
            Role::Oxygen => &mut counters.oxygen_id,
            Role::Hydrogen => &mut counters.hydrogen_id,
        };
        *slot += 1;
        *slot
    }

    /// Copies the counters out, for diagnostics and tests.
    #[must_use]
    pub fn snapshot(&self) -> Counters {
        self.lock().clone()
    }

    /// Returns true once the supply has been declared exhausted.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.lock().supply_exhausted
    }
}
