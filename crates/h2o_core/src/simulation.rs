//! # Simulation
//!
//! Spawns one worker per unit, collects their outcomes and tears the run
//! down on failure.
//!
//! ```text
//!   Simulation::run
//!     │ prime exhaustion check
//!     │ spawn O 1..NO, then H 1..NH ──────────> worker threads
//!     │                                            │
//!     │ <──── crossbeam channel (unit, outcome) ───┘
//!     │ first error ──> abort: every parked worker wakes with Aborted
//!     │ join all threads (panics become WorkerPanicked)
//!     ▼
//!   RunReport
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::unbounded;
use tracing::{error, info, warn};

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::log::EventLog;
use crate::protocol::Protocol;
use crate::unit::{MoleculeId, Role, Unit, UnitId};
use crate::worker::{Worker, WorkerOutcome};

/// Default stack size of a worker thread.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Work handed to a spawner.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Creates the execution context of one worker.
pub trait WorkerSpawner: Send + Sync {
    /// Starts `job` for the unit `role id`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if no thread could be created.
    fn spawn(&self, role: Role, id: UnitId, job: Job) -> io::Result<JoinHandle<()>>;
}

/// Spawns named OS threads (`O-1`, `H-2`, ...).
#[derive(Clone, Copy, Debug)]
pub struct ThreadSpawner {
    stack_size: usize,
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl WorkerSpawner for ThreadSpawner {
    fn spawn(&self, role: Role, id: UnitId, job: Job) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("{}-{id}", role.symbol()))
            .stack_size(self.stack_size)
            .spawn(job)
    }
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Molecules formed.
    pub molecules: MoleculeId,
    /// Oxygen units that ended in a molecule.
    pub bonded_oxygen: u32,
    /// Hydrogen units that ended in a molecule.
    pub bonded_hydrogen: u32,
    /// Oxygen units stranded by exhaustion.
    pub rejected_oxygen: u32,
    /// Hydrogen units stranded by exhaustion.
    pub rejected_hydrogen: u32,
    /// Lines written to the event log.
    pub lines_written: u64,
}

impl RunReport {
    fn count(&mut self, role: Role, outcome: WorkerOutcome) {
        let slot = match (role, outcome) {
            (Role::Oxygen, WorkerOutcome::Bonded { .. }) => &mut self.bonded_oxygen,
            (Role::Hydrogen, WorkerOutcome::Bonded { .. }) => &mut self.bonded_hydrogen,
            (Role::Oxygen, WorkerOutcome::Rejected) => &mut self.rejected_oxygen,
            (Role::Hydrogen, WorkerOutcome::Rejected) => &mut self.rejected_hydrogen,
        };
        *slot += 1;
    }

    /// Units that ended in a molecule.
    #[must_use]
    pub const fn bonded(&self) -> u32 {
        self.bonded_oxygen + self.bonded_hydrogen
    }

    /// Units that were stranded.
    #[must_use]
    pub const fn rejected(&self) -> u32 {
        self.rejected_oxygen + self.rejected_hydrogen
    }
}

/// Aborts the run if the owning worker thread unwinds.
struct AbortOnPanic(Arc<Protocol>);

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// One configured run of the bonding protocol.
pub struct Simulation {
    config: SimulationConfig,
    protocol: Arc<Protocol>,
    spawner: Box<dyn WorkerSpawner>,
    started: AtomicBool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a run of `config` writing to `log`, on OS threads.
    #[must_use]
    pub fn new(config: SimulationConfig, log: EventLog) -> Self {
        let protocol = Arc::new(Protocol::new(config.plan(), log));
        Self {
            config,
            protocol,
            spawner: Box::new(ThreadSpawner::default()),
            started: AtomicBool::new(false),
        }
    }

    /// Replaces the worker spawner.
    #[must_use]
    pub fn with_spawner(mut self, spawner: impl WorkerSpawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    /// The run's configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The shared protocol state.
    #[must_use]
    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    /// Aborts a running simulation from another thread.
    pub fn abort(&self) {
        self.protocol.abort();
    }

    /// Runs every unit to completion and returns the summary.
    ///
    /// A simulation runs once.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::WorkerCreation`] if a worker cannot be spawned
    /// - [`SimulationError::WorkerPanicked`] if a worker panics
    /// - [`SimulationError::ResourceAcquisition`] if the log cannot be written
    /// - [`SimulationError::Aborted`] if [`Simulation::abort`] was called
    pub fn run(&self) -> SimulationResult<RunReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SimulationError::invalid_argument(
                "simulation",
                "a simulation can only run once",
            ));
        }

        let plan = self.config.plan();
        info!(
            oxygen = self.config.oxygen,
            hydrogen = self.config.hydrogen,
            molecules = plan.molecules_target,
            "simulation starting"
        );
        self.protocol.prime();

        let (tx, rx) = unbounded::<(Unit, SimulationResult<WorkerOutcome>)>();
        let mut handles: Vec<(Unit, JoinHandle<()>)> = Vec::new();

        for role in Role::ALL {
            for _ in 0..self.config.supply(role) {
                let id = self.protocol.state.register(role);
                let unit = Unit::new(role, id);
                let worker = Worker::new(Arc::clone(&self.protocol), unit, &self.config);
                let guard = AbortOnPanic(Arc::clone(&self.protocol));
                let worker_tx = tx.clone();

                let job: Job = Box::new(move || {
                    let _guard = guard;
                    let result = worker.run();
                    let _ = worker_tx.send((unit, result));
                });

                match self.spawner.spawn(role, id, job) {
                    Ok(handle) => handles.push((unit, handle)),
                    Err(source) => {
                        error!(%unit, error = %source, "failed to spawn worker");
                        self.protocol.abort();
                        Self::join(handles);
                        return Err(SimulationError::WorkerCreation { role, id, source });
                    }
                }
            }
        }
        drop(tx);

        let mut report = RunReport::default();
        let mut failure: Option<SimulationError> = None;
        for (unit, result) in rx.iter() {
            match result {
                Ok(outcome) => report.count(unit.role, outcome),
                Err(err) => {
                    if !matches!(err, SimulationError::Aborted) {
                        warn!(%unit, error = %err, "worker failed");
                        self.protocol.abort();
                    }
                    if failure
                        .as_ref()
                        .map_or(true, |f| matches!(f, SimulationError::Aborted))
                    {
                        failure = Some(err);
                    }
                }
            }
        }

        if let Some(panicked) = Self::join(handles) {
            return Err(panicked);
        }
        if let Some(err) = failure {
            return Err(err);
        }

        self.protocol.log.flush()?;
        report.molecules = self.protocol.state.snapshot().molecule_id;
        report.lines_written = self.protocol.log.lines_written();
        info!(
            molecules = report.molecules,
            bonded = report.bonded(),
            rejected = report.rejected(),
            lines = report.lines_written,
            "simulation finished"
        );
        Ok(report)
    }

    /// Joins every worker; returns the first panic as an error.
    fn join(handles: Vec<(Unit, JoinHandle<()>)>) -> Option<SimulationError> {
        let mut panicked = None;
        for (unit, handle) in handles {
            if handle.join().is_err() && panicked.is_none() {
                error!(%unit, "worker panicked");
                panicked = Some(SimulationError::WorkerPanicked {
                    role: unit.role,
                    id: unit.id,
                });
            }
        }
        panicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupplyPlan;
    use crate::log::{audit, MemorySink};
    use std::sync::atomic::AtomicUsize;

    /// Fails once `limit` threads have been created.
    struct LimitedSpawner {
        limit: usize,
        spawned: AtomicUsize,
    }

    impl WorkerSpawner for LimitedSpawner {
        fn spawn(&self, role: Role, id: UnitId, job: Job) -> io::Result<JoinHandle<()>> {
            if self.spawned.fetch_add(1, Ordering::SeqCst) >= self.limit {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "no threads left"));
            }
            ThreadSpawner::default().spawn(role, id, job)
        }
    }

    fn run(o: u32, h: u32) -> (RunReport, String) {
        let sink = MemorySink::new();
        let config = SimulationConfig::new(o, h, 5, 5).unwrap().with_seed(11);
        let report = Simulation::new(config, EventLog::new(sink.clone()))
            .run()
            .unwrap();
        (report, sink.contents())
    }

    #[test]
    fn test_report_counts() {
        let (report, log) = run(5, 7);
        assert_eq!(report.molecules, 3);
        assert_eq!(report.bonded_oxygen, 3);
        assert_eq!(report.bonded_hydrogen, 6);
        assert_eq!(report.rejected_oxygen, 2);
        assert_eq!(report.rejected_hydrogen, 1);
        assert_eq!(report.lines_written, log.lines().count() as u64);
        assert!(audit(&log, &SupplyPlan::new(5, 7)).is_ok());
    }

    #[test]
    fn test_empty_run() {
        let (report, log) = run(0, 0);
        assert_eq!(report, RunReport::default());
        assert!(log.is_empty());
    }

    #[test]
    fn test_runs_once() {
        let config = SimulationConfig::new(0, 1, 0, 0).unwrap();
        let sim = Simulation::new(config, EventLog::new(MemorySink::new()));
        assert!(sim.run().is_ok());
        assert!(matches!(
            sim.run(),
            Err(SimulationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_spawn_failure_aborts_started_workers() {
        let config = SimulationConfig::new(2, 4, 0, 0).unwrap();
        let sim = Simulation::new(config, EventLog::new(MemorySink::new())).with_spawner(
            LimitedSpawner {
                limit: 3,
                spawned: AtomicUsize::new(0),
            },
        );

        let err = sim.run().unwrap_err();
        // Oxygens are spawned first: O 1, O 2, H 1 succeed, H 2 fails.
        assert!(matches!(
            err,
            SimulationError::WorkerCreation {
                role: Role::Hydrogen,
                id: 2,
                ..
            }
        ));
        assert!(sim.protocol().is_aborted());
    }

    #[test]
    fn test_thread_names() {
        let handle = ThreadSpawner::default()
            .spawn(
                Role::Hydrogen,
                4,
                Box::new(|| {
                    assert_eq!(thread::current().name(), Some("H-4"));
                }),
            )
            .unwrap();
        handle.join().unwrap();
    }
}
