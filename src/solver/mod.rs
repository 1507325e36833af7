//! Matrix solver for the analog part of a netlist.
//!
//! The solved (non-rail) analog nets are split into groups of nets joined
//! by branches. Each group is an independent linear system `G·V = I`:
//!
//! ```text
//! row k:  Σ gt · V_k  -  Σ go · V_j  =  Σ idr  +  Σ go · V_rail
//!         (terminals on net k)        (partners in the group / on rails)
//! ```
//!
//! Rows are scaled by their diagonal before solving. Small groups are
//! solved by elimination, with closed forms for one and two unknowns;
//! larger groups by Gauss-Seidel with per-row adaptive weights, falling back
//! to elimination when the iteration cap is hit. Groups with diodes or
//! transistors wrap the linear solve in a Newton-Raphson loop.
//!
//! ## Scheduling
//!
//! The [`SolverDevice`] takes part in the event-driven simulation through
//! solver-owned logic nets:
//!
//! - a demand (a source changed, a stamp was modified) toggles the group's
//!   sync net at the current time,
//! - static mode solves the time-stepped groups every `1 / freq`,
//! - dynamic mode lets each time-stepped group reschedule itself by the
//!   step its local truncation error allows.
//!
//! Solved voltages are written back to the nets; every net that moved by
//! more than the accuracy gets an event, which is how analog changes reach
//! proxies and observers.

mod device;
mod gauss_seidel;
mod group;
mod matrix;
mod newton;
mod params;
mod timestep;

pub use device::{partition, SolverDevice, SOLVER};
pub use gauss_seidel::{gauss_seidel, Relaxation};
pub use group::{MatrixSolver, SolverKind, SolverStats, OSCILLATION_GUARD};
pub use matrix::{Matrix, SingularPivot, PIVOT_EPSILON};
pub use newton::NewtonRaphson;
pub use params::{SolverParams, DEFAULT_ACCURACY, DEFAULT_FREQ, DEFAULT_GS_LOOPS, DEFAULT_NR_LOOPS};
pub use timestep::LteEstimator;
