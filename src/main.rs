//! netlist - event-driven mixed-signal netlist simulator
//!
//! Runs a netlist description for a given duration and prints every probe
//! observation as `<time> <probe> <value>`.
//!
//! # Usage
//!
//! ```bash
//! netlist counter.net --duration 5ms --dynamic-ts
//! RUST_LOG=netlist_core=debug netlist filter.net --freq 96k
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use netlist_core::{
    dsl::{self, parse_time_value, parse_value},
    error::{NetlistError, Result},
    Circuit, DeviceRegistry, LogicFamily, Simulator, SimulatorConfig, SolverParams, Time,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logic family used for inserted proxies.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Family {
    Ttl,
    Cmos,
}

/// Event-driven mixed-signal netlist simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist description
    #[arg(value_name = "FILE")]
    netlist: PathBuf,

    /// Simulated time to run (e.g. 10ms, 2.5us, 1s)
    #[arg(short, long, default_value = "10ms", value_parser = seconds)]
    duration: f64,

    /// Solver step frequency in Hz (e.g. 48k)
    #[arg(short, long, value_parser = hertz)]
    freq: Option<f64>,

    /// Choose time steps from the local truncation error
    #[arg(long)]
    dynamic_ts: bool,

    /// Solve independent linear groups in parallel
    #[arg(long)]
    parallel: bool,

    /// Logic family of analog/digital proxies
    #[arg(long, value_enum, default_value_t = Family::Ttl)]
    family: Family,

    /// Log solver activity (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn seconds(s: &str) -> std::result::Result<f64, String> {
    match parse_time_value(s) {
        Some(t) if t >= 0.0 => Ok(t),
        _ => Err(format!("invalid duration '{}'", s)),
    }
}

fn hertz(s: &str) -> std::result::Result<f64, String> {
    match parse_value(s.trim_end_matches("Hz")) {
        Some(f) if f > 0.0 => Ok(f),
        _ => Err(format!("invalid frequency '{}'", s)),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let ast = dsl::parse_file(&args.netlist)?;

    let mut solver = SolverParams::default();
    for setting in &ast.solver {
        solver.apply(&setting.key, setting.value)?;
    }
    if let Some(freq) = args.freq {
        solver = solver.with_freq(freq);
    }
    if args.dynamic_ts {
        solver = solver.with_dynamic_ts(true);
    }
    if args.parallel {
        solver = solver.with_parallel(true);
    }

    let family = match args.family {
        Family::Ttl => LogicFamily::ttl(),
        Family::Cmos => LogicFamily::cmos_5v(),
    };
    let config = SimulatorConfig::new()
        .with_solver(solver)
        .with_logic_family(family);

    let circuit = Circuit::from_ast(&ast, DeviceRegistry::with_defaults())?;
    let mut sim = Simulator::new(circuit, config)?;

    let mut stimuli: Vec<_> = ast.stimuli.iter().collect();
    stimuli.sort_by_key(|s| s.time);

    let end = Time::from_double(args.duration);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for s in stimuli.into_iter().filter(|s| s.time <= end) {
        sim.run_until(s.time);
        sim.set_param(&s.device, "IN", s.value)?;
        print_observations(&mut sim, &mut out)?;
    }
    sim.run_until(end);
    print_observations(&mut sim, &mut out)?;
    out.flush()
        .map_err(|e| NetlistError::OutputWriteError { source: e })?;

    info!("{} events in {}", sim.event_count(), sim.time());
    sim.log_solver_stats();
    Ok(())
}

fn print_observations(sim: &mut Simulator, out: &mut impl Write) -> Result<()> {
    for obs in sim.take_observations() {
        writeln!(out, "{:.12} {} {}", obs.time.as_double(), obs.probe, obs.value)
            .map_err(|e| NetlistError::OutputWriteError { source: e })?;
    }
    Ok(())
}
