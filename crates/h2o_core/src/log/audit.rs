//! # Log Audit
//!
//! Reads an event log back and checks it against the supply plan.
//!
//! ## What Is Checked
//!
//! 1. Sequence numbers are exactly `1..=lines`, in order
//! 2. Every unit of the supply appears, and only those units
//! 3. Every unit follows `started → going to queue → (creating → created | rejection)`
//! 4. Every molecule has exactly one oxygen and two hydrogens
//! 5. Molecule ids are `1..=molecules_target`
//! 6. Rejection counts per role equal the stranded counts
//! 7. All `created` lines of molecule N precede every `creating` line of N+1
//! 8. The line count equals [`SupplyPlan::expected_lines`]

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::config::SupplyPlan;
use crate::log::event::Event;
use crate::unit::{MoleculeId, Role, UnitId};

/// One parsed log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Sequence number.
    pub seq: u64,
    /// Role of the emitting unit.
    pub role: Role,
    /// Identity of the emitting unit.
    pub id: UnitId,
    /// What happened.
    pub event: Event,
}

impl LogRecord {
    /// Parses `<seq>: <R> <id>: <message>`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditViolation::Malformed`] if the line does not follow the
    /// format.
    pub fn parse(line_no: usize, line: &str) -> Result<Self, AuditViolation> {
        let malformed = || AuditViolation::Malformed {
            line_no,
            line: line.to_string(),
        };
        let (seq, rest) = line.split_once(": ").ok_or_else(malformed)?;
        let (who, message) = rest.split_once(": ").ok_or_else(malformed)?;
        let (symbol, id) = who.split_once(' ').ok_or_else(malformed)?;

        Ok(Self {
            seq: seq.parse().map_err(|_| malformed())?,
            role: Role::from_symbol(symbol).ok_or_else(malformed)?,
            id: id.parse().map_err(|_| malformed())?,
            event: message.parse().map_err(|_| malformed())?,
        })
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}: {}", self.seq, self.role, self.id, self.event)
    }
}

/// A single broken property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditViolation {
    /// A line could not be parsed.
    #[error("line {line_no} is malformed: {line:?}")]
    Malformed {
        /// 1-based line number.
        line_no: usize,
        /// The raw line.
        line: String,
    },

    /// Sequence numbers skip, repeat or go backwards.
    #[error("line {line_no} has sequence {found}, expected {expected}")]
    SequenceGap {
        /// 1-based line number.
        line_no: usize,
        /// The sequence number that should be there.
        expected: u64,
        /// The sequence number found.
        found: u64,
    },

    /// A unit outside the supply logged something.
    #[error("unknown unit {role} {id}")]
    UnknownUnit {
        /// Role.
        role: Role,
        /// Identity.
        id: UnitId,
    },

    /// A unit in the supply never logged.
    #[error("unit {role} {id} never logged")]
    MissingUnit {
        /// Role.
        role: Role,
        /// Identity.
        id: UnitId,
    },

    /// A unit's events do not follow its lifecycle.
    #[error("unit {role} {id} has an invalid lifecycle: {events}")]
    BadLifecycle {
        /// Role.
        role: Role,
        /// Identity.
        id: UnitId,
        /// The unit's events, comma separated.
        events: String,
    },

    /// A molecule does not have one oxygen and two hydrogens.
    #[error("molecule {molecule} has {oxygen} O and {hydrogen} H")]
    BadComposition {
        /// Molecule id.
        molecule: MoleculeId,
        /// Oxygen participants.
        oxygen: u32,
        /// Hydrogen participants.
        hydrogen: u32,
    },

    /// Molecule ids are not `1..=target`.
    #[error("molecules formed {found:?}, expected 1..={target}")]
    MoleculeIds {
        /// Molecule ids found, sorted.
        found: Vec<MoleculeId>,
        /// The planned molecule count.
        target: u32,
    },

    /// A rejection was logged by the wrong role or the counts are off.
    #[error("{role} rejections: found {found}, expected {expected}")]
    RejectionCount {
        /// Role.
        role: Role,
        /// Rejections found.
        found: u32,
        /// Rejections expected.
        expected: u32,
    },

    /// Molecule N+1 started assembling before molecule N finished.
    #[error("molecule {next} started creating before molecule {previous} was created")]
    Overlap {
        /// The earlier molecule.
        previous: MoleculeId,
        /// The later molecule.
        next: MoleculeId,
    },

    /// The log has the wrong number of lines.
    #[error("log has {found} lines, expected {expected}")]
    LineCount {
        /// Lines found.
        found: u64,
        /// Lines expected.
        expected: u64,
    },
}

/// Every violation found in one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFailure {
    /// The violations in discovery order. Never empty.
    pub violations: Vec<AuditViolation>,
}

impl fmt::Display for AuditFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} audit violation(s)", self.violations.len())?;
        if let Some(first) = self.violations.first() {
            write!(f, ", first: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AuditFailure {}

/// Summary of a clean log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Lines in the log.
    pub lines: u64,
    /// Molecules formed.
    pub molecules: u32,
    /// Oxygen units that logged `not enough H`.
    pub rejected_oxygen: u32,
    /// Hydrogen units that logged `not enough O or H`.
    pub rejected_hydrogen: u32,
}

#[derive(Default)]
struct MoleculeTrace {
    oxygen: u32,
    hydrogen: u32,
    first_creating: Option<u64>,
    last_created: Option<u64>,
}

/// Audits the complete text of a log.
///
/// # Errors
///
/// Returns [`AuditFailure`] listing every violation found.
pub fn audit(text: &str, plan: &SupplyPlan) -> Result<AuditReport, AuditFailure> {
    let mut violations = Vec::new();
    let mut timelines: BTreeMap<(Role, UnitId), Vec<LogRecord>> = BTreeMap::new();
    let mut lines = 0u64;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        lines += 1;
        match LogRecord::parse(line_no, line) {
            Ok(record) => {
                if record.seq != lines {
                    violations.push(AuditViolation::SequenceGap {
                        line_no,
                        expected: lines,
                        found: record.seq,
                    });
                }
                timelines.entry((record.role, record.id)).or_default().push(record);
            }
            Err(violation) => violations.push(violation),
        }
    }

    check_units(plan, &timelines, &mut violations);

    let mut molecules: BTreeMap<MoleculeId, MoleculeTrace> = BTreeMap::new();
    let mut report = AuditReport {
        lines,
        ..AuditReport::default()
    };

    for (&(role, id), records) in &timelines {
        let events: Vec<Event> = records.iter().map(|r| r.event).collect();
        match events.as_slice() {
            [Event::Started, Event::GoingToQueue, Event::Creating(a), Event::Created(b)]
                if a == b =>
            {
                let trace = molecules.entry(*a).or_default();
                match role {
                    Role::Oxygen => trace.oxygen += 1,
                    Role::Hydrogen => trace.hydrogen += 1,
                }
                let creating = records[2].seq;
                let created = records[3].seq;
                trace.first_creating = Some(trace.first_creating.map_or(creating, |s| s.min(creating)));
                trace.last_created = Some(trace.last_created.map_or(created, |s| s.max(created)));
            }
            [Event::Started, Event::GoingToQueue, rejection] if *rejection == Event::rejection(role) => {
                match role {
                    Role::Oxygen => report.rejected_oxygen += 1,
                    Role::Hydrogen => report.rejected_hydrogen += 1,
                }
            }
            _ => violations.push(AuditViolation::BadLifecycle {
                role,
                id,
                events: events
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    for (&molecule, trace) in &molecules {
        if trace.oxygen != Role::Oxygen.per_molecule()
            || trace.hydrogen != Role::Hydrogen.per_molecule()
        {
            violations.push(AuditViolation::BadComposition {
                molecule,
                oxygen: trace.oxygen,
                hydrogen: trace.hydrogen,
            });
        }
    }

    for ((&previous, earlier), (&next, later)) in molecules.iter().zip(molecules.iter().skip(1)) {
        if let (Some(created), Some(creating)) = (earlier.last_created, later.first_creating) {
            if creating < created {
                violations.push(AuditViolation::Overlap { previous, next });
            }
        }
    }

    let found: Vec<MoleculeId> = molecules.keys().copied().collect();
    if !found.iter().copied().eq(1..=plan.molecules_target) {
        violations.push(AuditViolation::MoleculeIds {
            found,
            target: plan.molecules_target,
        });
    }
    report.molecules = u32::try_from(molecules.len()).unwrap_or(u32::MAX);

    for (role, found) in [
        (Role::Oxygen, report.rejected_oxygen),
        (Role::Hydrogen, report.rejected_hydrogen),
    ] {
        let expected = plan.stranded(role);
        if found != expected {
            violations.push(AuditViolation::RejectionCount {
                role,
                found,
                expected,
            });
        }
    }

    if lines != plan.expected_lines() {
        violations.push(AuditViolation::LineCount {
            found: lines,
            expected: plan.expected_lines(),
        });
    }

    if violations.is_empty() {
        Ok(report)
    } else {
        Err(AuditFailure { violations })
    }
}

fn check_units(
    plan: &SupplyPlan,
    timelines: &BTreeMap<(Role, UnitId), Vec<LogRecord>>,
    violations: &mut Vec<AuditViolation>,
) {
    for role in Role::ALL {
        let supply = match role {
            Role::Oxygen => plan.oxygen_supply,
            Role::Hydrogen => plan.hydrogen_supply,
        };
        for id in 1..=supply {
            if !timelines.contains_key(&(role, id)) {
                violations.push(AuditViolation::MissingUnit { role, id });
            }
        }
    }
    for &(role, id) in timelines.keys() {
        let supply = match role {
            Role::Oxygen => plan.oxygen_supply,
            Role::Hydrogen => plan.hydrogen_supply,
        };
        if id == 0 || id > supply {
            violations.push(AuditViolation::UnknownUnit { role, id });
        }
    }
}
