//! # Simulation Error Types
//!
//! All errors that can end a run. Every one of them is fatal at the process
//! level: nothing here is retried. Running out of supply is NOT an error, a
//! stranded unit simply terminates in the `Rejected` state.

use std::io;

use thiserror::Error;

use crate::sync::Closed;
use crate::unit::Role;

/// Errors that can occur while configuring or running a simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// A command line value was missing, malformed or out of range.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The log sink or another run-wide resource could not be acquired or used.
    #[error("failed to acquire {resource}: {source}")]
    ResourceAcquisition {
        /// The resource that failed.
        resource: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The execution context for a unit could not be created.
    #[error("failed to spawn worker {role} {id}: {source}")]
    WorkerCreation {
        /// Role of the unit that could not be spawned.
        role: Role,
        /// Identity of the unit.
        id: u32,
        /// Underlying IO error from the thread builder.
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked before reporting its outcome.
    #[error("worker {role} {id} panicked")]
    WorkerPanicked {
        /// Role of the unit.
        role: Role,
        /// Identity of the unit.
        id: u32,
    },

    /// The run was aborted while this unit was blocked.
    #[error("simulation aborted")]
    Aborted,
}

impl From<Closed> for SimulationError {
    fn from(_: Closed) -> Self {
        Self::Aborted
    }
}

impl SimulationError {
    /// Builds an [`SimulationError::InvalidArgument`].
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
