//! # Event Log
//!
//! Serialized, sequenced, flushed line output.
//!
//! ```text
//!   Worker O 1 ──┐
//!   Worker H 1 ──┼──> [lock: print_counter += 1, write line, flush] ──> sink
//!   Worker H 2 ──┘
//! ```
//!
//! The sequence number is taken and the line written under the same lock, so
//! line order in the sink equals sequence order and no number is skipped. A
//! failed write does not consume a number.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{SimulationError, SimulationResult};
use crate::log::event::Event;
use crate::unit::Unit;

struct LogInner {
    /// Sequence number of the last line written.
    print_counter: u64,
    /// Destination of the lines.
    sink: Box<dyn Write + Send>,
}

/// Ordered event log shared by all workers of a run.
pub struct EventLog {
    inner: Mutex<LogInner>,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("lines_written", &self.lines_written())
            .finish_non_exhaustive()
    }
}

impl EventLog {
    /// Wraps any writer as a log sink.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(LogInner {
                print_counter: 0,
                sink: Box::new(sink),
            }),
        }
    }

    /// Creates (truncating) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ResourceAcquisition`] if the file cannot be
    /// created.
    pub fn create(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let file = File::create(path.as_ref()).map_err(|source| {
            SimulationError::ResourceAcquisition {
                resource: "event log",
                source,
            }
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Appends `<seq>: <role> <id>: <event>` and flushes it.
    ///
    /// Returns the sequence number the line was written with.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ResourceAcquisition`] if the sink rejects
    /// the write or the flush.
    pub fn record(&self, unit: &Unit, event: Event) -> SimulationResult<u64> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let seq = inner.print_counter + 1;

        writeln!(inner.sink, "{seq}: {unit}: {event}")
            .and_then(|()| inner.sink.flush())
            .map_err(|source| SimulationError::ResourceAcquisition {
                resource: "event log",
                source,
            })?;

        inner.print_counter = seq;
        tracing::trace!(seq, %unit, %event, "logged");
        Ok(seq)
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.inner.lock().print_counter
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ResourceAcquisition`] if the flush fails.
    pub fn flush(&self) -> SimulationResult<()> {
        self.inner
            .lock()
            .sink
            .flush()
            .map_err(|source| SimulationError::ResourceAcquisition {
                resource: "event log",
                source,
            })
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_line_format() {
        let sink = MemorySink::new();
        let log = EventLog::new(sink.clone());

        log.record(&Unit::oxygen(1), Event::Started).unwrap();
        log.record(&Unit::hydrogen(2), Event::Creating(1)).unwrap();
        log.record(&Unit::hydrogen(3), Event::NotEnoughOOrH).unwrap();

        assert_eq!(
            sink.contents(),
            "1: O 1: started\n2: H 2: creating molecule 1\n3: H 3: not enough O or H\n"
        );
        assert_eq!(log.lines_written(), 3);
    }

    #[test]
    fn test_concurrent_lines_are_gap_free() {
        let sink = MemorySink::new();
        let log = Arc::new(EventLog::new(sink.clone()));

        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for _ in 0..50 {
                        log.record(&Unit::hydrogen(id), Event::GoingToQueue).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let seqs: Vec<u64> = sink
            .contents()
            .lines()
            .map(|line| line.split_once(": ").unwrap().0.parse().unwrap())
            .collect();
        assert_eq!(seqs, (1..=400).collect::<Vec<_>>());
    }

    #[test]
    fn test_failed_write_is_reported() {
        let log = EventLog::new(BrokenSink);
        let err = log.record(&Unit::oxygen(1), Event::Started).unwrap_err();
        assert!(matches!(err, SimulationError::ResourceAcquisition { .. }));
        assert_eq!(log.lines_written(), 0);
    }
}
