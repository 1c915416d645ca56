//! # Units
//!
//! A unit is one simulated atom. It has a role, a role-scoped identity starting
//! at 1, and once matched, the identity of the molecule it belongs to.

use std::fmt;

/// Identity of a unit within its role. Starts at 1.
pub type UnitId = u32;

/// Identity of a molecule. Starts at 1, assigned per matched triple.
pub type MoleculeId = u32;

/// Number of oxygen units in one molecule.
pub const OXYGEN_PER_MOLECULE: u32 = 1;

/// Number of hydrogen units in one molecule.
pub const HYDROGEN_PER_MOLECULE: u32 = 2;

/// Number of units in one molecule.
pub const UNITS_PER_MOLECULE: u32 = OXYGEN_PER_MOLECULE + HYDROGEN_PER_MOLECULE;

/// The kind of atom a unit simulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Oxygen. Leads the bonding of its molecule.
    Oxygen,
    /// Hydrogen.
    Hydrogen,
}

impl Role {
    /// Both roles, oxygen first.
    pub const ALL: [Self; 2] = [Self::Oxygen, Self::Hydrogen];

    /// Single-letter symbol used in the event log.
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Oxygen => 'O',
            Self::Hydrogen => 'H',
        }
    }

    /// Parses a log symbol back into a role.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "O" => Some(Self::Oxygen),
            "H" => Some(Self::Hydrogen),
            _ => None,
        }
    }

    /// How many units of this role one molecule consumes.
    #[inline]
    #[must_use]
    pub const fn per_molecule(self) -> u32 {
        match self {
            Self::Oxygen => OXYGEN_PER_MOLECULE,
            Self::Hydrogen => HYDROGEN_PER_MOLECULE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One simulated atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unit {
    /// Oxygen or hydrogen.
    pub role: Role,
    /// Role-scoped identity.
    pub id: UnitId,
}

impl Unit {
    /// Creates a unit.
    #[must_use]
    pub const fn new(role: Role, id: UnitId) -> Self {
        Self { role, id }
    }

    /// Creates an oxygen unit.
    #[must_use]
    pub const fn oxygen(id: UnitId) -> Self {
        Self::new(Role::Oxygen, id)
    }

    /// Creates a hydrogen unit.
    #[must_use]
    pub const fn hydrogen(id: UnitId) -> Self {
        Self::new(Role::Hydrogen, id)
    }

    /// Returns true for the leader of a triple.
    #[inline]
    #[must_use]
    pub const fn is_oxygen(&self) -> bool {
        matches!(self.role, Role::Oxygen)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}
