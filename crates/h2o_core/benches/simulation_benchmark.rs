//! Benchmark for complete bonding runs and the event log.
//!
//! Run with: cargo bench --package h2o_core --bench simulation_benchmark

use std::io;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2o_core::{Event, EventLog, Simulation, SimulationConfig, Unit};

fn benchmark_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_run");
    group.sample_size(20);

    for molecules in [1u32, 10, 50] {
        let units = u64::from(molecules) * 3;
        group.throughput(Throughput::Elements(units));
        group.bench_with_input(
            BenchmarkId::from_parameter(molecules),
            &molecules,
            |b, &molecules| {
                b.iter(|| {
                    let config = SimulationConfig::new(molecules, molecules * 2, 0, 0)
                        .expect("valid config")
                        .with_seed(1);
                    let report = Simulation::new(config, EventLog::new(io::sink()))
                        .run()
                        .expect("run completes");
                    black_box(report)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_event_log(c: &mut Criterion) {
    let log = EventLog::new(io::sink());
    let unit = Unit::hydrogen(1);

    c.bench_function("event_log_record", |b| {
        b.iter(|| black_box(log.record(&unit, Event::Creating(7)).expect("sink accepts")));
    });
}

criterion_group!(benches, benchmark_simulation, benchmark_event_log);
criterion_main!(benches);
