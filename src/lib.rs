//! # Netlist Core
//!
//! An event-driven mixed-signal netlist simulator.
//!
//! Digital devices (gates, flip-flops, counters, timers) exchange logic
//! levels through a time-ordered event queue. Analog devices stamp
//! conductances and currents into per-group linear systems which are solved
//! by direct elimination or Gauss-Seidel relaxation, with Newton-Raphson
//! iteration for nonlinear elements. Proxies convert between the two
//! domains wherever a net mixes them.
//!
//! ## Architecture
//!
//! - [`time`] - Picosecond fixed-point simulation time
//! - [`circuit`] - Net/terminal arenas, circuit setup and finalisation
//! - [`scheduler`] - The event queue
//! - [`devices`] - Device library, parameters, logic families and registry
//! - [`solver`] - Matrix solvers and the solver device that schedules them
//! - [`simulator`] - The main event loop and external input injection
//! - [`dsl`] - Parser for the text netlist description
//!
//! ## Usage
//!
//! ```no_run
//! use netlist_core::{dsl, Circuit, DeviceRegistry, Simulator, SimulatorConfig, Time};
//!
//! # fn main() -> netlist_core::Result<()> {
//! let ast = dsl::parse(
//!     "LOGIC_INPUT A\nTTL_7404_INVERT U1 A.Q\n.probe U1.Q\n",
//! )?;
//! let circuit = Circuit::from_ast(&ast, DeviceRegistry::with_defaults())?;
//! let mut sim = Simulator::new(circuit, SimulatorConfig::default())?;
//! sim.set_logic_input("A", true)?;
//! sim.run_until(Time::from_usec(1));
//! for obs in sim.take_observations() {
//!     println!("{:.12} {} {}", obs.time.as_double(), obs.probe, obs.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Simulation Method
//!
//! Every event pops the earliest pending net change off the queue and
//! notifies the inputs listening to that net. A change on a net feeding an
//! analog group requests a solve of that group at the current time. Groups
//! holding capacitors are additionally stepped, either at a fixed rate or
//! with a step size chosen from the local truncation error.

pub mod circuit;
pub mod devices;
pub mod dsl;
pub mod error;
pub mod scheduler;
pub mod simulator;
pub mod solver;
pub mod time;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use devices::{DeviceRegistry, LogicFamily, Observation};
pub use dsl::parse;
pub use error::{NetlistError, Result};
pub use simulator::{Simulator, SimulatorConfig};
pub use solver::{SolverParams, SolverStats};
pub use time::Time;
