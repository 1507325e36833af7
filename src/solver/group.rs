//! Linear system of one solver group.

use std::collections::HashMap;
use std::ops::AddAssign;

use tracing::{debug, error, warn};

use crate::circuit::{DeviceId, GroupId, NetId, NetState, TerminalId, TerminalKind};
use crate::devices::Device;
use crate::error::{NetlistError, Result};
use crate::scheduler::EventQueue;
use crate::time::Time;

use super::gauss_seidel::gauss_seidel;
use super::matrix::Matrix;
use super::newton::NewtonRaphson;
use super::params::SolverParams;
use super::timestep::LteEstimator;

/// Solves closer than this to the previous one are skipped unless demanded.
pub const OSCILLATION_GUARD: Time = Time::from_nsec(1);

/// How a group's linear system is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Direct elimination
    Direct,
    /// Gauss-Seidel relaxation, falling back to elimination
    GaussSeidel,
}

/// Per-group solver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Completed solves
    pub solves: u64,
    /// Newton-Raphson iterations over all solves
    pub newton_iterations: u64,
    /// Gauss-Seidel sweeps over all solves
    pub gs_iterations: u64,
    /// Gauss-Seidel runs that hit the cap and fell back to elimination
    pub gs_fallbacks: u64,
    /// Newton-Raphson runs that hit the cap
    pub nr_failures: u64,
    /// Solves abandoned on a singular matrix
    pub singular: u64,
    /// Solves skipped by the oscillation guard
    pub skipped: u64,
}

impl AddAssign for SolverStats {
    fn add_assign(&mut self, rhs: Self) {
        self.solves += rhs.solves;
        self.newton_iterations += rhs.newton_iterations;
        self.gs_iterations += rhs.gs_iterations;
        self.gs_fallbacks += rhs.gs_fallbacks;
        self.nr_failures += rhs.nr_failures;
        self.singular += rhs.singular;
        self.skipped += rhs.skipped;
    }
}

/// A branch end contributing to one row.
#[derive(Debug, Clone, Copy)]
struct RowTerm {
    terminal: TerminalId,
    /// Partner terminal, if the branch has one
    other: Option<TerminalId>,
    /// Row of the partner's net when it is solved in this group
    other_row: Option<usize>,
}

/// Assembly and linear solve of a group's system.
#[derive(Debug, Clone)]
struct LinearSystem {
    id: GroupId,
    kind: SolverKind,
    rows: Vec<Vec<RowTerm>>,
    matrix: Matrix,
    params: SolverParams,
    stats: SolverStats,
    /// Voltages before the current solve, restored on a singular matrix
    v_start: Vec<f64>,
}

impl LinearSystem {
    /// Assemble the system from the current terminal stamps.
    ///
    /// Rows follow `Σ gt·V_self - go·V_other = Σ idr`; partners on rails
    /// move to the right hand side.
    fn build(&mut self, state: &NetState) {
        self.matrix.clear();
        for (k, row) in self.rows.iter().enumerate() {
            for term in row {
                let t = state.terminal(term.terminal);
                self.matrix.add(k, k, t.gt);
                self.matrix.add_source(k, t.idr);
                match (term.other_row, term.other) {
                    (Some(j), _) => self.matrix.add(k, j, -t.go),
                    (None, Some(other)) => self.matrix.add_source(k, t.go * state.analog(other)),
                    (None, None) => {}
                }
            }
        }
        self.matrix.precondition(self.params.gmin);
    }

    fn solve(&mut self, x: &mut [f64]) {
        if self.kind == SolverKind::GaussSeidel {
            let r = gauss_seidel(
                &self.matrix,
                x,
                self.params.gs_loops,
                self.params.accuracy,
                self.params.sor_factor,
            );
            self.stats.gs_iterations += r.iterations as u64;
            if r.converged {
                return;
            }
            self.stats.gs_fallbacks += 1;
            warn!(
                "group {}: Gauss-Seidel did not converge in {} loops, solving directly",
                self.id, r.iterations
            );
        }
        self.solve_direct(x);
    }

    fn solve_direct(&mut self, x: &mut [f64]) {
        let mut result = self.matrix.solve_direct(x, self.params.pivot);
        if result.is_err() && !self.params.pivot {
            debug!("group {}: zero pivot, retrying with pivoting", self.id);
            result = self.matrix.solve_direct(x, true);
        }
        if let Err(pivot) = result {
            self.stats.singular += 1;
            error!(
                "{}, keeping previous voltages",
                NetlistError::SingularMatrix {
                    group: self.id.0,
                    row: pivot.row,
                }
            );
            x.copy_from_slice(&self.v_start);
        }
    }
}

/// Solver for one connected group of analog nets.
#[derive(Debug, Clone)]
pub struct MatrixSolver {
    pub id: GroupId,
    /// Solved nets, one per row
    nets: Vec<NetId>,
    /// Devices re-linearised every Newton-Raphson iteration
    dynamic: Vec<DeviceId>,
    /// Devices advanced by `step_time`
    timestep: Vec<DeviceId>,
    /// Solver-owned logic net scheduling this group
    pub(crate) sync: NetId,
    system: LinearSystem,
    v: Vec<f64>,
    newton: NewtonRaphson,
    lte: LteEstimator,
    last_solve: Option<Time>,
    /// Length of the step being solved, zero for a re-solve
    step: f64,
    /// A solve was demanded since the last one
    pub(crate) dirty: bool,
    next_ts: f64,
    /// Waiting for a concurrent linear solve
    pub(crate) staged: bool,
}

impl MatrixSolver {
    /// Build the solver for `nets`, which must all be solved nets of one
    /// connected group.
    pub fn new(
        id: GroupId,
        nets: Vec<NetId>,
        sync: NetId,
        state: &NetState,
        devices: &[Device],
        params: &SolverParams,
    ) -> Self {
        let index: HashMap<NetId, usize> =
            nets.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let mut rows = Vec::with_capacity(nets.len());
        let mut dynamic = Vec::new();
        let mut timestep = Vec::new();
        for &net in &nets {
            let mut row = Vec::new();
            for &t in &state.net(net).terminals {
                let term = state.terminal(t);
                if term.kind != TerminalKind::Terminal {
                    continue;
                }
                let other_row = term
                    .other
                    .and_then(|o| index.get(&state.net_of(o)).copied());
                row.push(RowTerm {
                    terminal: t,
                    other: term.other,
                    other_row,
                });
                if let Some(device) = devices.get(term.device.0) {
                    if device.is_dynamic() {
                        dynamic.push(term.device);
                    }
                    if device.is_timestep() {
                        timestep.push(term.device);
                    }
                }
            }
            rows.push(row);
        }
        dynamic.sort_unstable();
        dynamic.dedup();
        timestep.sort_unstable();
        timestep.dedup();

        let n = nets.len();
        let kind = if n <= params.gs_threshold {
            SolverKind::Direct
        } else {
            SolverKind::GaussSeidel
        };
        let v: Vec<f64> = nets.iter().map(|&net| state.net(net).cur).collect();

        Self {
            id,
            nets,
            dynamic,
            timestep,
            sync,
            system: LinearSystem {
                id,
                kind,
                rows,
                matrix: Matrix::new(n),
                params: params.clone(),
                stats: SolverStats::default(),
                v_start: v.clone(),
            },
            lte: LteEstimator::new(&v),
            v,
            newton: NewtonRaphson::new(params.nr_loops, params.accuracy),
            last_solve: None,
            step: 0.0,
            dirty: true,
            next_ts: params.max_timestep,
            staged: false,
        }
    }

    /// Number of unknowns.
    pub fn size(&self) -> usize {
        self.nets.len()
    }

    pub fn kind(&self) -> SolverKind {
        self.system.kind
    }

    /// Solved nets, in row order.
    pub fn nets(&self) -> &[NetId] {
        &self.nets
    }

    /// Current solution, in row order.
    pub fn voltages(&self) -> &[f64] {
        &self.v
    }

    /// Check if the group holds nonlinear devices.
    pub fn has_dynamic_devices(&self) -> bool {
        !self.dynamic.is_empty()
    }

    /// Check if the group holds time-stepped devices.
    pub fn has_timestep_devices(&self) -> bool {
        !self.timestep.is_empty()
    }

    pub fn stats(&self) -> SolverStats {
        self.system.stats
    }

    /// Time step suggested by the last solve.
    pub fn next_timestep(&self) -> f64 {
        self.next_ts
    }

    /// Forget all history, as after a simulator reset.
    pub fn reset(&mut self, state: &NetState) {
        self.load(state);
        self.lte.reset(&self.v);
        self.last_solve = None;
        self.step = 0.0;
        self.dirty = true;
        self.next_ts = self.system.params.max_timestep;
        self.staged = false;
        self.system.stats = SolverStats::default();
    }

    fn load(&mut self, state: &NetState) {
        for (x, &net) in self.v.iter_mut().zip(&self.nets) {
            *x = state.net(net).cur;
        }
        self.system.v_start.copy_from_slice(&self.v);
    }

    /// Start a solve at `now`: apply the oscillation guard, advance the
    /// time-stepped devices and load the current voltages.
    ///
    /// Returns `false` when the solve is skipped.
    pub fn begin(&mut self, now: Time, state: &mut NetState, devices: &mut [Device]) -> bool {
        self.step = 0.0;
        if let Some(last) = self.last_solve {
            let delta = now - last;
            if delta < OSCILLATION_GUARD {
                if !self.dirty {
                    self.system.stats.skipped += 1;
                    return false;
                }
            } else {
                self.step = delta.as_double();
                for &dev in &self.timestep {
                    devices[dev.0].step_time(self.step, state);
                }
            }
        }
        self.dirty = false;
        self.load(state);
        true
    }

    /// Assemble the system from the current terminal stamps.
    pub fn build(&mut self, state: &NetState) {
        self.system.build(state);
    }

    /// Solve the assembled system into the group's voltages.
    pub fn solve_linear(&mut self) {
        self.system.solve(&mut self.v);
    }

    /// Run Newton-Raphson over the group's nonlinear devices.
    ///
    /// Tentative voltages are written to the nets' `cur` on every iteration
    /// so the devices linearise around them.
    pub fn solve_newton(&mut self, state: &mut NetState, devices: &mut [Device]) -> Result<usize> {
        let Self {
            newton,
            v,
            dynamic,
            nets,
            system,
            ..
        } = self;
        let result = newton.solve(v, |x| {
            for &dev in dynamic.iter() {
                devices[dev.0].update_terminals(state);
            }
            system.build(state);
            system.solve(x);
            for (&net, &value) in nets.iter().zip(x.iter()) {
                state.net_mut(net).cur = value;
            }
        });
        match &result {
            Ok(iterations) => system.stats.newton_iterations += *iterations as u64,
            Err(_) => {
                system.stats.newton_iterations += system.params.nr_loops as u64;
                system.stats.nr_failures += 1;
            }
        }
        result
    }

    /// Solve at `now` on the calling thread. Returns `Ok(false)` when the
    /// oscillation guard skipped the solve.
    pub fn solve(
        &mut self,
        now: Time,
        state: &mut NetState,
        devices: &mut [Device],
        queue: &mut EventQueue,
    ) -> Result<bool> {
        if !self.begin(now, state, devices) {
            return Ok(false);
        }
        let outcome = if self.has_dynamic_devices() {
            self.solve_newton(state, devices).map(|_| ())
        } else {
            self.build(state);
            self.solve_linear();
            Ok(())
        };
        self.finish(now, state, queue);
        outcome.map(|_| true)
    }

    /// Write the solution back and schedule every net that moved.
    ///
    /// A net whose value changed by more than the accuracy since inputs last
    /// saw it gets an event at `now`; the event makes the change visible.
    pub fn finish(&mut self, now: Time, state: &mut NetState, queue: &mut EventQueue) {
        let params = &self.system.params;
        for (&net, &value) in self.nets.iter().zip(&self.v) {
            let n = state.net_mut(net);
            n.cur = value;
            if (value - n.last).abs() > params.accuracy {
                if let Err(e) = queue.push(net, Time::ZERO) {
                    error!("group {}: {}", self.id, e);
                }
            }
        }
        if self.step > 0.0 && !self.timestep.is_empty() {
            self.next_ts = self.lte.next_timestep(
                &self.v,
                self.step,
                params.lte,
                params.min_timestep,
                params.max_timestep,
            );
        }
        self.last_solve = Some(now);
        self.system.stats.solves += 1;
    }
}
