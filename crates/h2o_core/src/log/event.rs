//! Event vocabulary of the log.

use std::fmt;
use std::str::FromStr;

use crate::unit::{MoleculeId, Role};

/// One thing a unit can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// The worker started.
    Started,
    /// The start delay elapsed, the unit enters the pairing gate.
    GoingToQueue,
    /// The unit was matched and begins assembly.
    Creating(MoleculeId),
    /// Bonding finished.
    Created(MoleculeId),
    /// Stranded oxygen: no hydrogen pair left.
    NotEnoughH,
    /// Stranded hydrogen: no oxygen or partner left.
    NotEnoughOOrH,
}

impl Event {
    /// The rejection message a stranded unit of `role` logs.
    #[must_use]
    pub const fn rejection(role: Role) -> Self {
        match role {
            Role::Oxygen => Self::NotEnoughH,
            Role::Hydrogen => Self::NotEnoughOOrH,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::GoingToQueue => f.write_str("going to queue"),
            Self::Creating(id) => write!(f, "creating molecule {id}"),
            Self::Created(id) => write!(f, "molecule {id} created"),
            Self::NotEnoughH => f.write_str("not enough H"),
            Self::NotEnoughOOrH => f.write_str("not enough O or H"),
        }
    }
}

/// The message was not one the protocol emits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event message {0:?}")]
pub struct UnknownEvent(pub String);

impl FromStr for Event {
    type Err = UnknownEvent;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownEvent(message.to_string());
        match message {
            "started" => return Ok(Self::Started),
            "going to queue" => return Ok(Self::GoingToQueue),
            "not enough H" => return Ok(Self::NotEnoughH),
            "not enough O or H" => return Ok(Self::NotEnoughOOrH),
            _ => {}
        }
        if let Some(id) = message.strip_prefix("creating molecule ") {
            return id.parse().map(Self::Creating).map_err(|_| unknown());
        }
        if let Some(id) = message
            .strip_prefix("molecule ")
            .and_then(|rest| rest.strip_suffix(" created"))
        {
            return id.parse().map(Self::Created).map_err(|_| unknown());
        }
        Err(unknown())
    }
}
