//! # Assembly Barrier
//!
//! Moves the three units of one molecule through assembly as a group.
//!
//! ## Phases
//!
//! ```text
//!            O                    H                    H
//!   creating molecule N   creating molecule N   creating molecule N
//!            │   assembling_count == 3 ──> post all_present
//!   wait all_present              │                    │
//!   bond delay                    │                    │
//!   post bonded x3                │                    │
//!   wait bonded            wait bonded          wait bonded
//!   molecule N created     molecule N created   molecule N created
//!            │   staged 1 O + 2 H ──> shutdown check, post release x3,
//!            │                        post bookkeeping
//!   wait release           wait release         wait release
//!   wait bookkeeping              ▼                    ▼
//!            ▼                 Released             Released
//!         Released (caller then hands the gate's turnstile back)
//! ```
//!
//! The release and the bookkeeping acknowledgement are two separate signals:
//! the oxygen only leaves after the staging counters have been settled.

use tracing::debug;

use crate::error::SimulationResult;
use crate::log::Event;
use crate::protocol::Protocol;
use crate::sync::Semaphore;
use crate::unit::{MoleculeId, Role, Unit, HYDROGEN_PER_MOLECULE, OXYGEN_PER_MOLECULE, UNITS_PER_MOLECULE};

/// Three-party rendezvous led by the molecule's oxygen.
#[derive(Debug)]
pub struct AssemblyBarrier {
    /// Posted once when the third unit announces `creating`.
    all_present: Semaphore,
    /// Posted three times by the oxygen after the bond delay.
    bonded: Semaphore,
    /// Posted three times once the triple is staged.
    release: Semaphore,
    /// Posted once after release bookkeeping; consumed by the oxygen.
    bookkeeping: Semaphore,
}

impl Default for AssemblyBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyBarrier {
    /// Creates a barrier with no pending signals.
    #[must_use]
    pub fn new() -> Self {
        Self {
            all_present: Semaphore::new("all_present", 0),
            bonded: Semaphore::new("bonded", 0),
            release: Semaphore::new("release", 0),
            bookkeeping: Semaphore::new("bookkeeping", 0),
        }
    }

    /// Runs `unit` through assembly of `molecule`.
    ///
    /// `bond` is the bonding delay. Only the oxygen calls it.
    ///
    /// # Errors
    ///
    /// Returns an error if a log line cannot be written, or
    /// [`crate::SimulationError::Aborted`] if the run is aborted while the
    /// unit waits.
    pub fn assemble<F>(
        &self,
        protocol: &Protocol,
        unit: Unit,
        molecule: MoleculeId,
        bond: F,
    ) -> SimulationResult<()>
    where
        F: FnOnce(),
    {
        protocol.log.record(&unit, Event::Creating(molecule))?;
        {
            let mut counters = protocol.state.lock();
            counters.assembling_count += 1;
            if counters.assembling_count == UNITS_PER_MOLECULE {
                counters.assembling_count = 0;
                self.all_present.release();
            }
        }

        if unit.is_oxygen() {
            self.all_present.acquire()?;
            bond();
            self.bonded.release_many(UNITS_PER_MOLECULE as usize);
        }
        self.bonded.acquire()?;

        protocol.log.record(&unit, Event::Created(molecule))?;
        self.stage(protocol, unit.role, molecule);

        self.release.acquire()?;
        if unit.is_oxygen() {
            self.bookkeeping.acquire()?;
        }
        Ok(())
    }

    /// Counts `role` in front of the release; the last of the triple settles
    /// the counters and opens the barrier.
    fn stage(&self, protocol: &Protocol, role: Role, molecule: MoleculeId) {
        let mut counters = protocol.state.lock();
        match role {
            Role::Oxygen => counters.barrier_oxygen_ready += 1,
            Role::Hydrogen => counters.barrier_hydrogen_ready += 1,
        }

        if counters.barrier_oxygen_ready >= OXYGEN_PER_MOLECULE
            && counters.barrier_hydrogen_ready >= HYDROGEN_PER_MOLECULE
        {
            counters.barrier_oxygen_ready -= OXYGEN_PER_MOLECULE;
            counters.barrier_hydrogen_ready -= HYDROGEN_PER_MOLECULE;
            protocol
                .shutdown
                .on_staged_locked(&mut counters, &protocol.gate, molecule);
            self.release.release_many(UNITS_PER_MOLECULE as usize);
            self.bookkeeping.release();
            debug!(molecule, "molecule released");
        }
    }

    /// Wakes every unit blocked in the barrier.
    pub fn close(&self) {
        self.all_present.close();
        self.bonded.close();
        self.release.close();
        self.bookkeeping.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupplyPlan;
    use crate::log::{EventLog, MemorySink};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn protocol(plan: SupplyPlan) -> (Arc<Protocol>, MemorySink) {
        let sink = MemorySink::new();
        let protocol = Arc::new(Protocol::new(plan, EventLog::new(sink.clone())));
        (protocol, sink)
    }

    fn run_triple(protocol: &Arc<Protocol>, molecule: MoleculeId, bonds: &Arc<AtomicU32>) {
        let handles: Vec<_> = [Unit::oxygen(1), Unit::hydrogen(1), Unit::hydrogen(2)]
            .into_iter()
            .map(|unit| {
                let protocol = Arc::clone(protocol);
                let bonds = Arc::clone(bonds);
                thread::spawn(move || {
                    protocol.barrier.assemble(&protocol, unit, molecule, || {
                        bonds.fetch_add(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
    }

    #[test]
    fn test_triple_bonds_once_and_logs_in_order() {
        let (protocol, sink) = protocol(SupplyPlan::new(2, 4));
        let bonds = Arc::new(AtomicU32::new(0));

        run_triple(&protocol, 1, &bonds);

        assert_eq!(bonds.load(Ordering::SeqCst), 1);
        let lines: Vec<String> = sink.contents().lines().map(String::from).collect();
        assert_eq!(lines.len(), 6);
        // All three `creating` lines come before any `created` line.
        assert!(lines[..3].iter().all(|l| l.ends_with("creating molecule 1")));
        assert!(lines[3..].iter().all(|l| l.ends_with("molecule 1 created")));

        let counters = protocol.state.snapshot();
        assert_eq!(counters.assembling_count, 0);
        assert_eq!(counters.barrier_oxygen_ready, 0);
        assert_eq!(counters.barrier_hydrogen_ready, 0);
        assert!(!counters.supply_exhausted);
    }

    #[test]
    fn test_final_molecule_marks_exhaustion() {
        let (protocol, _sink) = protocol(SupplyPlan::new(1, 3));
        let bonds = Arc::new(AtomicU32::new(0));

        run_triple(&protocol, 1, &bonds);

        assert!(protocol.state.is_exhausted());
        // One hydrogen is stranded and gets its release permit.
        assert_eq!(protocol.gate.hydrogen_permits(), 1);
        assert_eq!(protocol.gate.oxygen_permits(), 0);
    }

    fn wait_until(protocol: &Protocol, pred: impl Fn(&Protocol) -> bool) {
        for _ in 0..1000 {
            if pred(protocol) {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached: {:?}", protocol.state.snapshot());
    }

    #[test]
    fn test_oxygen_waits_for_bookkeeping_after_release() {
        let (protocol, _sink) = protocol(SupplyPlan::new(2, 4));
        // The two hydrogens already announced `creating`.
        protocol.state.lock().assembling_count = 2;

        let oxygen = {
            let protocol = Arc::clone(&protocol);
            thread::spawn(move || protocol.barrier.assemble(&protocol, Unit::oxygen(1), 1, || {}))
        };
        wait_until(&protocol, |p| p.state.snapshot().barrier_oxygen_ready == 1);

        protocol.barrier.release.release();
        thread::sleep(Duration::from_millis(20));
        assert!(!oxygen.is_finished());

        protocol.barrier.bookkeeping.release();
        oxygen.join().unwrap().unwrap();
    }

    #[test]
    fn test_hydrogen_leaves_on_release_alone() {
        let (protocol, _sink) = protocol(SupplyPlan::new(2, 4));
        protocol.barrier.bonded.release();

        let hydrogen = {
            let protocol = Arc::clone(&protocol);
            thread::spawn(move || protocol.barrier.assemble(&protocol, Unit::hydrogen(1), 1, || {}))
        };
        wait_until(&protocol, |p| p.state.snapshot().barrier_hydrogen_ready == 1);

        protocol.barrier.release.release();
        hydrogen.join().unwrap().unwrap();
        assert_eq!(protocol.barrier.bookkeeping.available_permits(), 0);
    }

    #[test]
    fn test_close_unblocks_waiting_hydrogen() {
        let (protocol, _sink) = protocol(SupplyPlan::new(1, 2));
        let waiter = {
            let protocol = Arc::clone(&protocol);
            thread::spawn(move || protocol.barrier.assemble(&protocol, Unit::hydrogen(1), 1, || {}))
        };

        while protocol.log.lines_written() == 0 {
            thread::yield_now();
        }
        protocol.abort();

        assert!(matches!(
            waiter.join().unwrap(),
            Err(crate::error::SimulationError::Aborted)
        ));
    }
}
