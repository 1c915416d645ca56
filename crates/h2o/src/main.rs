//! # H2O
//!
//! Command line runner for the water molecule simulation.
//!
//! ```text
//! h2o NO NH TI TB [-o h2o.out] [--seed N] [--verify]
//! ```
//!
//! Writes the event log to the output file and exits with 0 on success, 1 on
//! any argument, resource or worker creation error. Diagnostics go to stderr
//! and are filtered with `RUST_LOG` (default `warn`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use h2o_core::{
    audit, parse_count, parse_delay, EventLog, Simulation, SimulationConfig, SimulationError,
    SimulationResult, MAX_DELAY_MS,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simulates water molecule formation from oxygen and hydrogen threads.
#[derive(Parser, Debug)]
#[command(name = "h2o", version)]
#[command(about = "Simulates water molecule formation from oxygen and hydrogen threads")]
struct Cli {
    /// Number of oxygen units
    #[arg(value_name = "NO")]
    oxygen: String,

    /// Number of hydrogen units
    #[arg(value_name = "NH")]
    hydrogen: String,

    /// Max delay in ms before a unit queues (0-1000)
    #[arg(value_name = "TI")]
    start_delay: String,

    /// Max delay in ms for bonding one molecule (0-1000)
    #[arg(value_name = "TB")]
    bond_delay: String,

    /// Event log file
    #[arg(short, long, default_value = "h2o.out")]
    output: PathBuf,

    /// Seed for reproducible delays
    #[arg(long)]
    seed: Option<u64>,

    /// Audit the event log after the run
    #[arg(long)]
    verify: bool,
}

impl Cli {
    fn config(&self) -> SimulationResult<SimulationConfig> {
        let config = SimulationConfig::new(
            parse_count("NO", &self.oxygen)?,
            parse_count("NH", &self.hydrogen)?,
            parse_delay("TI", &self.start_delay)?,
            parse_delay("TB", &self.bond_delay)?,
        )?;
        Ok(match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn usage_error(err: &SimulationError) -> ExitCode {
    eprintln!("h2o: {err}");
    eprintln!("{}", Cli::command().render_usage());
    eprintln!("TI and TB must be within 0..={MAX_DELAY_MS}");
    ExitCode::FAILURE
}

fn verify(path: &Path, config: &SimulationConfig) -> bool {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("h2o: cannot read {} for verification: {err}", path.display());
            return false;
        }
    };
    match audit(&text, &config.plan()) {
        Ok(report) => {
            info!(
                lines = report.lines,
                molecules = report.molecules,
                "event log verified"
            );
            true
        }
        Err(failure) => {
            eprintln!("h2o: {failure}");
            for violation in &failure.violations {
                eprintln!("  {violation}");
            }
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not errors
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();

    let config = match cli.config() {
        Ok(config) => config,
        Err(err) => return usage_error(&err),
    };

    let log = match EventLog::create(&cli.output) {
        Ok(log) => log,
        Err(err) => {
            error!(output = %cli.output.display(), "cannot open event log");
            eprintln!("h2o: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = match Simulation::new(config.clone(), log).run() {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "simulation failed");
            eprintln!("h2o: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        molecules = report.molecules,
        bonded = report.bonded(),
        rejected = report.rejected(),
        lines = report.lines_written,
        output = %cli.output.display(),
        "run complete"
    );

    if cli.verify && !verify(&cli.output, &config) {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
