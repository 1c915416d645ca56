//! # Pairing Gate
//!
//! Matches arriving units into triples of one oxygen and two hydrogens.
//!
//! ## Flow
//!
//! ```text
//!  arrive ──> [turnstile] ──> waiting += 1 ──> triple complete?
//!                                   │                │
//!                                   │ no             │ yes: molecule_id += 1
//!                                   ▼                │      consume 1 O + 2 H
//!                          release turnstile         │      post O queue x1, H queue x2
//!                                   │                │      turnstile stays taken
//!                                   └──────┬─────────┘
//!                                          ▼
//!                                park on own role queue
//!                                          │
//!                  woken by a match ───────┴──────── woken by the exhaustion flush
//!                  (Matched(molecule_id))            (Stranded)
//! ```
//!
//! The turnstile taken by a successful match is handed over to the triple: its
//! oxygen gives it back after the assembly barrier's bookkeeping is complete
//! (see [`PairingGate::finish_match`]). Until then no other arrival can touch
//! the matching counters, so one molecule is in flight at a time and the
//! molecule id read after waking is the one this unit was matched into.

use tracing::{debug, trace};

use crate::state::{Counters, SharedState};
use crate::sync::{Closed, Semaphore};
use crate::unit::{MoleculeId, Role, Unit, HYDROGEN_PER_MOLECULE, OXYGEN_PER_MOLECULE};

/// What happened to a unit at the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Matched into the given molecule.
    Matched(MoleculeId),
    /// Released by the exhaustion flush; can never be matched.
    Stranded,
}

/// Rendezvous point that forms triples.
#[derive(Debug)]
pub struct PairingGate {
    /// Serializes arrivals; held across a molecule's assembly after a match.
    turnstile: Semaphore,
    /// Parked oxygen units.
    oxygen_queue: Semaphore,
    /// Parked hydrogen units.
    hydrogen_queue: Semaphore,
}

impl Default for PairingGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingGate {
    /// Creates an open gate with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self {
            turnstile: Semaphore::new("turnstile", 1),
            oxygen_queue: Semaphore::new("oxygen_queue", 0),
            hydrogen_queue: Semaphore::new("hydrogen_queue", 0),
        }
    }

    fn queue(&self, role: Role) -> &Semaphore {
        match role {
            Role::Oxygen => &self.oxygen_queue,
            Role::Hydrogen => &self.hydrogen_queue,
        }
    }

    /// Registers `unit` as waiting, forms a triple if possible, then parks
    /// until released.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the run is aborted while the unit waits.
    pub fn enter(&self, state: &SharedState, unit: Unit) -> Result<Admission, Closed> {
        self.turnstile.acquire()?;

        let formed = {
            let mut counters = state.lock();
            match unit.role {
                Role::Oxygen => {
                    counters.oxygen_waiting += 1;
                    if counters.hydrogen_waiting >= HYDROGEN_PER_MOLECULE {
                        Some(self.form(&mut counters))
                    } else {
                        None
                    }
                }
                Role::Hydrogen => {
                    counters.hydrogen_waiting += 1;
                    if counters.hydrogen_waiting >= HYDROGEN_PER_MOLECULE
                        && counters.oxygen_waiting >= OXYGEN_PER_MOLECULE
                    {
                        Some(self.form(&mut counters))
                    } else {
                        None
                    }
                }
            }
        };

        match formed {
            Some(molecule) => debug!(molecule, trigger = %unit, "triple formed"),
            None => self.turnstile.release(),
        }

        trace!(%unit, "parked");
        self.queue(unit.role).acquire()?;

        let counters = state.lock();
        if counters.supply_exhausted {
            Ok(Admission::Stranded)
        } else {
            Ok(Admission::Matched(counters.molecule_id))
        }
    }

    /// Consumes one triple from the waiting counts and releases its units.
    fn form(&self, counters: &mut Counters) -> MoleculeId {
        counters.molecule_id += 1;
        counters.hydrogen_waiting -= HYDROGEN_PER_MOLECULE;
        self.hydrogen_queue.release_many(HYDROGEN_PER_MOLECULE as usize);
        counters.oxygen_waiting -= OXYGEN_PER_MOLECULE;
        self.oxygen_queue.release_many(OXYGEN_PER_MOLECULE as usize);
        counters.molecule_id
    }

    /// Hands the turnstile back once a triple has fully left the barrier.
    pub fn finish_match(&self) {
        self.turnstile.release();
    }

    /// Releases stranded units from their queues.
    pub fn flush(&self, oxygen: u32, hydrogen: u32) {
        self.oxygen_queue.release_many(oxygen as usize);
        self.hydrogen_queue.release_many(hydrogen as usize);
    }

    /// Wakes every unit blocked at the gate with [`Closed`].
    pub fn close(&self) {
        self.turnstile.close();
        self.oxygen_queue.close();
        self.hydrogen_queue.close();
    }

    /// Release permits not yet taken from the oxygen queue.
    #[must_use]
    pub fn oxygen_permits(&self) -> usize {
        self.oxygen_queue.available_permits()
    }

    /// Release permits not yet taken from the hydrogen queue.
    #[must_use]
    pub fn hydrogen_permits(&self) -> usize {
        self.hydrogen_queue.available_permits()
    }

    /// Returns true once [`PairingGate::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.turnstile.is_closed()
    }
}
