//! Integration tests for complete simulation runs.

use std::io::{self, Write};

use h2o_core::log::AuditViolation;
use h2o_core::{
    audit, EventLog, MemorySink, Simulation, SimulationConfig, SimulationError, SupplyPlan,
};

fn temp_log_path() -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_h2o_{id}.out"))
}

fn run(oxygen: u32, hydrogen: u32, ti: u64, tb: u64) -> String {
    let sink = MemorySink::new();
    let config = SimulationConfig::new(oxygen, hydrogen, ti, tb).unwrap();
    Simulation::new(config, EventLog::new(sink.clone()))
        .run()
        .unwrap();
    sink.contents()
}

fn lines_of<'a>(log: &'a str, who: &str) -> Vec<&'a str> {
    let needle = format!(": {who}: ");
    log.lines().filter(|l| l.contains(&needle)).collect()
}

#[test]
fn test_two_oxygen_three_hydrogen() {
    let log = run(2, 3, 100, 100);
    let report = audit(&log, &SupplyPlan::new(2, 3)).unwrap();

    assert_eq!(report.molecules, 1);
    assert_eq!(report.rejected_oxygen, 1);
    assert_eq!(report.rejected_hydrogen, 1);
    assert_eq!(log.lines().count(), 18);
    assert_eq!(log.matches("not enough H").count(), 1);
    assert_eq!(log.matches("not enough O or H").count(), 1);
    assert_eq!(log.matches("creating molecule 1").count(), 3);
    assert_eq!(log.matches("molecule 1 created").count(), 3);
}

#[test]
fn test_no_oxygen() {
    let log = run(0, 5, 0, 0);
    let report = audit(&log, &SupplyPlan::new(0, 5)).unwrap();

    assert_eq!(report.molecules, 0);
    assert_eq!(report.rejected_hydrogen, 5);
    assert_eq!(log.lines().count(), 15);
    assert!(!log.contains("creating"));
}

#[test]
fn test_hydrogen_limited() {
    let log = run(5, 2, 10, 10);
    let report = audit(&log, &SupplyPlan::new(5, 2)).unwrap();

    assert_eq!(report.molecules, 1);
    assert_eq!(report.rejected_oxygen, 4);
    assert_eq!(report.rejected_hydrogen, 0);
    assert_eq!(log.lines().count(), 24);
}

#[test]
fn test_exact_supply_has_no_rejections() {
    let log = run(4, 8, 5, 5);
    let report = audit(&log, &SupplyPlan::new(4, 8)).unwrap();

    assert_eq!(report.molecules, 4);
    assert_eq!(report.rejected_oxygen + report.rejected_hydrogen, 0);
    assert!(!log.contains("not enough"));
}

#[test]
fn test_unit_lifecycle_order() {
    let log = run(3, 6, 5, 5);
    for id in 1..=3 {
        let lines = lines_of(&log, &format!("O {id}"));
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("started"));
        assert!(lines[1].ends_with("going to queue"));
        assert!(lines[2].contains("creating molecule"));
        assert!(lines[3].ends_with("created"));
    }
}

#[test]
fn test_zero_delays_many_units() {
    let log = run(30, 61, 0, 0);
    let plan = SupplyPlan::new(30, 61);
    let report = audit(&log, &plan).unwrap();

    assert_eq!(report.molecules, 30);
    assert_eq!(report.rejected_hydrogen, 1);
    assert_eq!(log.lines().count() as u64, plan.expected_lines());
}

#[test]
fn test_molecules_never_overlap() {
    let log = run(6, 12, 2, 0);
    // Every line of molecule N precedes every assembly line of N+1.
    let mut last_molecule = 0u32;
    for line in log.lines() {
        let molecule = line
            .rsplit_once("creating molecule ")
            .map(|(_, n)| n)
            .or_else(|| {
                line.split_once("molecule ")
                    .and_then(|(_, rest)| rest.strip_suffix(" created"))
            })
            .map(|n| n.parse::<u32>().unwrap());
        if let Some(m) = molecule {
            assert!(m >= last_molecule, "molecule {m} after {last_molecule}: {line}");
            last_molecule = m;
        }
    }
    assert_eq!(last_molecule, 6);
}

#[test]
fn test_log_file_is_written() {
    let path = temp_log_path();
    let config = SimulationConfig::new(1, 2, 0, 0).unwrap();
    let report = Simulation::new(config, EventLog::create(&path).unwrap())
        .run()
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(report.lines_written, 12);
    assert!(audit(&text, &SupplyPlan::new(1, 2)).is_ok());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_unwritable_log_path() {
    let path = std::env::temp_dir()
        .join("h2o_missing_dir_for_test")
        .join("nested")
        .join("h2o.out");
    let err = EventLog::create(&path).unwrap_err();
    assert!(matches!(err, SimulationError::ResourceAcquisition { .. }));
}

/// Accepts a fixed number of writes, then fails every one after.
struct FailingSink {
    remaining: usize,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.remaining -= 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_failure_aborts_run() {
    let config = SimulationConfig::new(3, 6, 0, 0).unwrap();
    let sim = Simulation::new(config, EventLog::new(FailingSink { remaining: 4 }));

    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimulationError::ResourceAcquisition { .. }));
    assert!(sim.protocol().is_aborted());
}

#[test]
fn test_abort_from_another_thread() {
    // Long delays keep every worker busy well past the abort.
    let config = SimulationConfig::new(2, 4, 1000, 1000).unwrap();
    let sim = Simulation::new(config, EventLog::new(MemorySink::new()));

    std::thread::scope(|s| {
        let runner = s.spawn(|| sim.run());
        std::thread::sleep(std::time::Duration::from_millis(20));
        sim.abort();
        assert!(matches!(
            runner.join().unwrap(),
            Err(SimulationError::Aborted)
        ));
    });
}

#[test]
fn test_audit_catches_tampering() {
    let log = run(1, 2, 0, 0);
    let plan = SupplyPlan::new(1, 2);
    let tampered = log.replacen("molecule 1 created", "molecule 2 created", 1);

    let failure = audit(&tampered, &plan).unwrap_err();
    assert!(failure
        .violations
        .iter()
        .any(|v| matches!(v, AuditViolation::BadLifecycle { .. })));
}
