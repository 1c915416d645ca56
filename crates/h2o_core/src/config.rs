//! # Simulation Configuration
//!
//! Run parameters and the supply plan derived from them.
//!
//! The plan is computed once at startup and never changes:
//!
//! ```text
//! molecules_target = min(NO, NH / 2)
//! oxygen_used      = min(NO, molecules_target)
//! hydrogen_used    = molecules_target * 3 - oxygen_used
//! ```

use std::time::Duration;

use crate::error::{SimulationError, SimulationResult};
use crate::unit::{Role, HYDROGEN_PER_MOLECULE, UNITS_PER_MOLECULE};

/// Upper bound for both delay parameters, in milliseconds.
pub const MAX_DELAY_MS: u64 = 1000;

/// Parameters of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of oxygen units (NO).
    pub oxygen: u32,
    /// Number of hydrogen units (NH).
    pub hydrogen: u32,
    /// Upper bound of the delay before a unit queues, ms (TI).
    pub start_delay_ms: u64,
    /// Upper bound of the bonding delay, ms (TB).
    pub bond_delay_ms: u64,
    /// Seed for reproducible delays. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidArgument`] if a delay bound exceeds
    /// [`MAX_DELAY_MS`].
    pub fn new(
        oxygen: u32,
        hydrogen: u32,
        start_delay_ms: u64,
        bond_delay_ms: u64,
    ) -> SimulationResult<Self> {
        check_delay("TI", start_delay_ms)?;
        check_delay("TB", bond_delay_ms)?;
        Ok(Self {
            oxygen,
            hydrogen,
            start_delay_ms,
            bond_delay_ms,
            seed: None,
        })
    }

    /// Makes delays reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns the supply of the given role.
    #[must_use]
    pub const fn supply(&self, role: Role) -> u32 {
        match role {
            Role::Oxygen => self.oxygen,
            Role::Hydrogen => self.hydrogen,
        }
    }

    /// Upper bound of the start delay.
    #[must_use]
    pub const fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Upper bound of the bonding delay.
    #[must_use]
    pub const fn bond_delay(&self) -> Duration {
        Duration::from_millis(self.bond_delay_ms)
    }

    /// Derives the supply plan.
    #[must_use]
    pub const fn plan(&self) -> SupplyPlan {
        SupplyPlan::new(self.oxygen, self.hydrogen)
    }

    /// Total number of workers this run spawns.
    #[must_use]
    pub const fn total_units(&self) -> u64 {
        self.oxygen as u64 + self.hydrogen as u64
    }
}

/// How many molecules can be formed and which units will be stranded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplyPlan {
    /// Oxygen supply.
    pub oxygen_supply: u32,
    /// Hydrogen supply.
    pub hydrogen_supply: u32,
    /// Molecules that will be formed.
    pub molecules_target: u32,
    /// Oxygen units that end up in a molecule.
    pub oxygen_used: u32,
    /// Hydrogen units that end up in a molecule.
    pub hydrogen_used: u32,
}

impl SupplyPlan {
    /// Computes the plan for the given supply.
    #[must_use]
    pub const fn new(oxygen_supply: u32, hydrogen_supply: u32) -> Self {
        let by_hydrogen = hydrogen_supply / HYDROGEN_PER_MOLECULE;
        let molecules_target = if oxygen_supply < by_hydrogen {
            oxygen_supply
        } else {
            by_hydrogen
        };
        let oxygen_used = if oxygen_supply < molecules_target {
            oxygen_supply
        } else {
            molecules_target
        };
        let hydrogen_used = molecules_target * UNITS_PER_MOLECULE - oxygen_used;
        Self {
            oxygen_supply,
            hydrogen_supply,
            molecules_target,
            oxygen_used,
            hydrogen_used,
        }
    }

    /// Oxygen units that can never be matched.
    #[must_use]
    pub const fn oxygen_stranded(&self) -> u32 {
        self.oxygen_supply - self.oxygen_used
    }

    /// Hydrogen units that can never be matched.
    #[must_use]
    pub const fn hydrogen_stranded(&self) -> u32 {
        self.hydrogen_supply - self.hydrogen_used
    }

    /// Stranded units of the given role.
    #[must_use]
    pub const fn stranded(&self, role: Role) -> u32 {
        match role {
            Role::Oxygen => self.oxygen_stranded(),
            Role::Hydrogen => self.hydrogen_stranded(),
        }
    }

    /// Number of lines a complete run writes to the event log.
    ///
    /// Every unit logs `started` and `going to queue`, every bonded unit logs
    /// `creating` and `created`, every stranded unit logs one rejection.
    #[must_use]
    pub const fn expected_lines(&self) -> u64 {
        let units = self.oxygen_supply as u64 + self.hydrogen_supply as u64;
        let bonded = self.molecules_target as u64 * UNITS_PER_MOLECULE as u64;
        let stranded = self.oxygen_stranded() as u64 + self.hydrogen_stranded() as u64;
        2 * units + 2 * bonded + stranded
    }
}

/// Parses a unit count. Only plain ASCII digits are accepted.
///
/// # Errors
///
/// Returns [`SimulationError::InvalidArgument`] for empty, signed, non-digit
/// or overflowing input.
pub fn parse_count(name: &'static str, raw: &str) -> SimulationResult<u32> {
    parse_digits(name, raw)?
        .try_into()
        .map_err(|_| SimulationError::invalid_argument(name, format!("{raw} is too large")))
}

/// Parses a delay bound in milliseconds, capped at [`MAX_DELAY_MS`].
///
/// # Errors
///
/// Returns [`SimulationError::InvalidArgument`] for malformed or out of range
/// input.
pub fn parse_delay(name: &'static str, raw: &str) -> SimulationResult<u64> {
    let value = parse_digits(name, raw)?;
    check_delay(name, value)?;
    Ok(value)
}

fn parse_digits(name: &'static str, raw: &str) -> SimulationResult<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SimulationError::invalid_argument(
            name,
            format!("{raw:?} is not a non-negative integer"),
        ));
    }
    raw.parse::<u64>()
        .map_err(|_| SimulationError::invalid_argument(name, format!("{raw} is too large")))
}

fn check_delay(name: &'static str, value: u64) -> SimulationResult<()> {
    if value > MAX_DELAY_MS {
        return Err(SimulationError::invalid_argument(
            name,
            format!("{value} is outside 0..={MAX_DELAY_MS}"),
        ));
    }
    Ok(())
}
