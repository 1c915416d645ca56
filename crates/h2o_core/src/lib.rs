//! # H2O Core
//!
//! Concurrent water molecule formation: oxygen and hydrogen units run as
//! independent threads and bond into molecules of one oxygen and two
//! hydrogens, under a fixed supply.
//!
//! ## Design Principles
//!
//! 1. **One lock for all counters** - every multi-counter check happens in a single critical section
//! 2. **Exact wakeups** - semaphores count permits, a release never wakes more units than it pays for
//! 3. **One molecule in flight** - a match holds the pairing turnstile until its triple leaves the barrier
//! 4. **Gap-free output** - every event line gets the next sequence number under the log's lock
//!
//! ## Lifecycle
//!
//! ```text
//!   started ─> going to queue ─┬─> creating molecule N ─> molecule N created
//!                              └─> not enough H / not enough O or H
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use h2o_core::{EventLog, Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::new(2, 3, 100, 100)?;
//! let report = Simulation::new(config, EventLog::create("h2o.out")?).run()?;
//! assert_eq!(report.molecules, 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod log;
pub mod protocol;
pub mod simulation;
pub mod state;
pub mod sync;
pub mod unit;
pub mod worker;

pub use config::{parse_count, parse_delay, SimulationConfig, SupplyPlan, MAX_DELAY_MS};
pub use error::{SimulationError, SimulationResult};
pub use log::{audit, AuditFailure, AuditReport, Event, EventLog, MemorySink};
pub use protocol::{Admission, AssemblyBarrier, PairingGate, Protocol, ShutdownCoordinator};
pub use simulation::{RunReport, Simulation, ThreadSpawner, WorkerSpawner};
pub use state::{Counters, SharedState};
pub use unit::{MoleculeId, Role, Unit, UnitId};
pub use worker::{Worker, WorkerOutcome};
