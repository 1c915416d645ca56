//! # Event Log
//!
//! The run's only output artifact: one line per unit event, numbered without
//! gaps. Diagnostics go through `tracing`, never through this log.
//!
//! - [`EventLog`] writes and sequences lines
//! - [`Event`] is the closed vocabulary of messages
//! - [`audit`] reads a finished log back and checks the protocol's guarantees

pub mod audit;
mod event;
mod event_log;

pub use audit::{audit, AuditFailure, AuditReport, AuditViolation, LogRecord};
pub use event::{Event, UnknownEvent};
pub use event_log::{EventLog, MemorySink};
