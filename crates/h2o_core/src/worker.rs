//! # Worker
//!
//! The life of one unit, run on its own thread.
//!
//! ```text
//! Created ─> Started ─> (start delay) ─> Queued ─┬─> Matched ─> Assembling ─> Bonded ─> Released
//!                                                └─> Rejected
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::log::Event;
use crate::protocol::{Admission, Protocol};
use crate::unit::{MoleculeId, Role, Unit};

/// How a worker finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Part of the given molecule.
    Bonded {
        /// Molecule the unit ended up in.
        molecule: MoleculeId,
    },
    /// Stranded after the supply ran out.
    Rejected,
}

/// One unit's thread body.
pub struct Worker {
    protocol: Arc<Protocol>,
    unit: Unit,
    start_bound: Duration,
    bond_bound: Duration,
    rng: ChaCha8Rng,
}

impl Worker {
    /// Prepares the worker for `unit` with delays and seed taken from
    /// `config`.
    #[must_use]
    pub fn new(protocol: Arc<Protocol>, unit: Unit, config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(unit_seed(seed, unit)),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            protocol,
            unit,
            start_bound: config.start_delay(),
            bond_bound: config.bond_delay(),
            rng,
        }
    }

    /// Runs the unit to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written or the run is aborted
    /// while the unit waits.
    pub fn run(mut self) -> SimulationResult<WorkerOutcome> {
        let protocol = Arc::clone(&self.protocol);
        let unit = self.unit;

        protocol.log.record(&unit, Event::Started)?;
        self.pause(self.start_bound);
        if protocol.is_aborted() {
            return Err(SimulationError::Aborted);
        }
        protocol.log.record(&unit, Event::GoingToQueue)?;

        let molecule = match protocol.gate.enter(&protocol.state, unit)? {
            Admission::Stranded => {
                trace!(%unit, "rejected");
                protocol.log.record(&unit, Event::rejection(unit.role))?;
                return Ok(WorkerOutcome::Rejected);
            }
            Admission::Matched(molecule) => molecule,
        };
        trace!(%unit, molecule, "matched");

        let bond_bound = self.bond_bound;
        protocol
            .barrier
            .assemble(&protocol, unit, molecule, || self.pause(bond_bound))?;

        if unit.is_oxygen() {
            protocol.gate.finish_match();
        }
        trace!(%unit, molecule, "released");
        Ok(WorkerOutcome::Bonded { molecule })
    }

    /// Sleeps a uniformly random whole number of milliseconds in `0..=bound`.
    fn pause(&mut self, bound: Duration) {
        let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
        if bound_ms == 0 {
            return;
        }
        let millis = self.rng.gen_range(0..=bound_ms);
        if millis > 0 {
            thread::sleep(Duration::from_millis(millis));
        }
    }
}

/// Derives a per-unit seed so that every unit of a seeded run draws its own
/// reproducible delay stream.
fn unit_seed(seed: u64, unit: Unit) -> u64 {
    let role: u64 = match unit.role {
        Role::Oxygen => 0,
        Role::Hydrogen => 1,
    };
    let key = (role << 32) | u64::from(unit.id);
    seed ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
