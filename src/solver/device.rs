//! The solver as a participant in the event-driven simulation.
//!
//! Every group owns a solver-driven logic net (the sync net). Toggling it
//! through the event queue makes the group solve when the event fires, so
//! solves interleave with digital activity in time order. In static mode a
//! further step net fires every `1 / freq` and solves the groups holding
//! time-stepped devices; in dynamic mode each such group reschedules its own
//! sync net by the step its truncation error allows.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, error, info, warn};

use crate::circuit::{
    DeviceId, Domain, GroupId, Net, NetId, NetState, Terminal, TerminalId, TerminalKind,
};
use crate::devices::{Device, DeviceModel};
use crate::scheduler::EventQueue;
use crate::time::Time;

use super::group::{MatrixSolver, SolverKind, SolverStats};
use super::params::SolverParams;

/// Instance name of the solver device.
pub const SOLVER: &str = "_SOLVER";

/// What an input of the solver device schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Group(usize),
    Step,
}

/// Split the solved nets into connected groups.
///
/// Two nets belong to the same group when a branch joins them; rails
/// bound the search. Groups and their nets come out in net order.
pub fn partition(state: &NetState) -> Vec<Vec<NetId>> {
    let mut seen = vec![false; state.nets.len()];
    let mut groups = Vec::new();

    for start in 0..state.nets.len() {
        let net = &state.nets[start];
        if seen[start] || !net.is_solved() || net.terminals.is_empty() {
            continue;
        }
        seen[start] = true;
        let mut group = Vec::new();
        let mut queue = VecDeque::from([NetId(start)]);
        while let Some(id) = queue.pop_front() {
            group.push(id);
            for &t in &state.net(id).terminals {
                let term = state.terminal(t);
                if term.kind != TerminalKind::Terminal {
                    continue;
                }
                let Some(other) = term.other else { continue };
                let on = state.net_of(other);
                if on.is_connected() && !seen[on.0] && state.net(on).is_solved() {
                    seen[on.0] = true;
                    queue.push_back(on);
                }
            }
        }
        groups.push(group);
    }
    groups
}

/// Toggle a solver-owned logic net and schedule it. An already pending
/// toggle keeps the earlier time.
fn schedule(net: NetId, delay: Time, state: &mut NetState, queue: &mut EventQueue) {
    if !queue.is_pending(net) {
        let n = state.net_mut(net);
        n.new_q = !n.q;
    }
    if let Err(e) = queue.push(net, delay) {
        error!("{}: {}", SOLVER, e);
    }
}

/// Create a solver-driven logic net with an input listening to it.
fn trigger_net(state: &mut NetState, device: DeviceId, pin: &str) -> (NetId, TerminalId) {
    let name = format!("{}.{}", SOLVER, pin);
    let q = state.add_terminal(Terminal::new(
        name.clone(),
        device,
        TerminalKind::Output,
        Domain::Logic,
    ));
    let mut net = Net::new(name.clone(), Domain::Logic);
    net.driver = Some(q);
    let id = state.add_net(net);
    state.attach(q, id);
    let input = state.add_terminal(Terminal::new(
        format!("{}_IN", name),
        device,
        TerminalKind::Input,
        Domain::Logic,
    ));
    state.attach(input, id);
    (id, input)
}

/// Owner of all solver groups.
#[derive(Debug)]
pub struct SolverDevice {
    params: SolverParams,
    device: DeviceId,
    groups: Vec<MatrixSolver>,
    triggers: HashMap<TerminalId, Trigger>,
    /// Static mode step clock
    step_net: Option<NetId>,
}

impl SolverDevice {
    /// Partition the finalised circuit into groups and register the
    /// solver device with its scheduling nets.
    pub fn new(state: &mut NetState, devices: &mut Vec<Device>, params: &SolverParams) -> Self {
        let device = DeviceId(devices.len());
        devices.push(Device::new(SOLVER, "SOLVER", DeviceModel::Solver));

        let mut triggers = HashMap::new();
        let mut groups = Vec::new();
        for (g, nets) in partition(state).into_iter().enumerate() {
            let id = GroupId(g);
            for &net in &nets {
                state.net_mut(net).group = Some(id);
            }
            let (sync, input) = trigger_net(state, device, &format!("Q{}", g));
            triggers.insert(input, Trigger::Group(g));
            let group = MatrixSolver::new(id, nets, sync, state, devices, params);
            debug!(
                "group {}: {} nets, {:?}{}{}",
                id,
                group.size(),
                group.kind(),
                if group.has_dynamic_devices() { ", nonlinear" } else { "" },
                if group.has_timestep_devices() { ", time-stepped" } else { "" },
            );
            groups.push(group);
        }

        let step_net = if params.dynamic_ts {
            None
        } else {
            let (net, input) = trigger_net(state, device, "STEP");
            triggers.insert(input, Trigger::Step);
            Some(net)
        };

        let iterative = groups
            .iter()
            .filter(|g| g.kind() == SolverKind::GaussSeidel)
            .count();
        info!(
            "solver: {} groups ({} iterative), {} mode",
            groups.len(),
            iterative,
            if params.dynamic_ts { "dynamic" } else { "static" }
        );

        Self {
            params: params.clone(),
            device,
            groups,
            triggers,
            step_net,
        }
    }

    /// Handle of the solver device.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn groups(&self) -> &[MatrixSolver] {
        &self.groups
    }

    /// Counters of every group, indexed by group.
    pub fn stats(&self) -> Vec<SolverStats> {
        self.groups.iter().map(MatrixSolver::stats).collect()
    }

    /// Log the counters of every group.
    pub fn log_stats(&self) {
        let mut total = SolverStats::default();
        for g in &self.groups {
            let s = g.stats();
            debug!(
                "group {} ({} nets): {} solves, {} skipped, {} NR iterations, {} GS iterations, {} fallbacks, {} NR failures, {} singular",
                g.id,
                g.size(),
                s.solves,
                s.skipped,
                s.newton_iterations,
                s.gs_iterations,
                s.gs_fallbacks,
                s.nr_failures,
                s.singular
            );
            total += s;
        }
        debug!("solver total: {:?}", total);
    }

    /// Solve every group at the current time and start the schedule.
    pub fn reset(&mut self, state: &mut NetState, devices: &mut [Device], queue: &mut EventQueue) {
        let now = queue.now();
        for g in 0..self.groups.len() {
            self.groups[g].reset(state);
            self.solve_group(g, now, state, devices, queue);
        }
        if let Some(step) = self.step_net {
            schedule(step, self.params.step_period(), state, queue);
        }
    }

    /// Ask for a solve of `group` at the current time.
    pub fn request(&mut self, group: GroupId, state: &mut NetState, queue: &mut EventQueue) {
        if let Some(g) = self.groups.get_mut(group.0) {
            g.dirty = true;
            schedule(g.sync, Time::ZERO, state, queue);
        }
    }

    /// React to one of the solver's scheduling nets.
    pub fn update(
        &mut self,
        trigger: TerminalId,
        state: &mut NetState,
        devices: &mut [Device],
        queue: &mut EventQueue,
    ) {
        let now = queue.now();
        match self.triggers.get(&trigger).copied() {
            Some(Trigger::Group(g)) => self.solve_group(g, now, state, devices, queue),
            Some(Trigger::Step) => self.step(now, state, devices, queue),
            None => warn!("{}: unexpected trigger {}", SOLVER, trigger),
        }
    }

    /// Static mode step: solve the time-stepped groups, or all groups while
    /// the circuit settles, and schedule the next step.
    fn step(&mut self, now: Time, state: &mut NetState, devices: &mut [Device], queue: &mut EventQueue) {
        let settling = now < Time::from_double(2.0 * self.params.max_timestep);
        let due: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| settling || g.has_timestep_devices())
            .map(|(i, _)| i)
            .collect();

        let mut serial = true;
        #[cfg(feature = "parallel")]
        {
            if self.params.parallel && due.len() > 1 {
                self.solve_parallel(&due, now, state, devices, queue);
                serial = false;
            }
        }
        if serial {
            for g in due {
                self.solve_group(g, now, state, devices, queue);
            }
        }

        if let Some(step) = self.step_net {
            schedule(step, self.params.step_period(), state, queue);
        }
    }

    fn solve_group(
        &mut self,
        g: usize,
        now: Time,
        state: &mut NetState,
        devices: &mut [Device],
        queue: &mut EventQueue,
    ) {
        let group = &mut self.groups[g];
        match group.solve(now, state, devices, queue) {
            Ok(true) => {
                if self.params.dynamic_ts && group.has_timestep_devices() {
                    let ts = Time::from_double(group.next_timestep());
                    schedule(group.sync, ts, state, queue);
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "group {}: {}, resolving in {}",
                    group.id, e, self.params.nr_recalc_delay
                );
                schedule(group.sync, self.params.nr_recalc_delay, state, queue);
            }
        }
    }

    /// Solve linear groups concurrently. Stepping and write-back stay on
    /// this thread; nonlinear groups are solved serially afterwards.
    #[cfg(feature = "parallel")]
    fn solve_parallel(
        &mut self,
        due: &[usize],
        now: Time,
        state: &mut NetState,
        devices: &mut [Device],
        queue: &mut EventQueue,
    ) {
        use rayon::prelude::*;

        let mut nonlinear = Vec::new();
        for &g in due {
            let group = &mut self.groups[g];
            if group.has_dynamic_devices() {
                nonlinear.push(g);
            } else if group.begin(now, state, devices) {
                group.staged = true;
            }
        }

        let shared: &NetState = state;
        self.groups
            .par_iter_mut()
            .filter(|g| g.staged)
            .for_each(|g| {
                g.build(shared);
                g.solve_linear();
            });

        for group in self.groups.iter_mut().filter(|g| g.staged) {
            group.staged = false;
            group.finish(now, state, queue);
        }
        for g in nonlinear {
            self.solve_group(g, now, state, devices, queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::devices::{LogicFamily, Params};

    fn divider() -> Circuit {
        let mut c = Circuit::new();
        let mut vin = Params::new();
        vin.set("IN", 1.0);
        c.add_device("ANALOG_INPUT", "VIN", &vin).unwrap();
        c.add_device("RES", "R1", &Params::new()).unwrap();
        c.add_device("RES", "R2", &Params::new()).unwrap();
        c.add_device("RES", "R3", &Params::new()).unwrap();
        c.add_device("RES", "R4", &Params::new()).unwrap();
        c.connect("VIN.Q", "R1.1").unwrap();
        c.connect("R1.2", "R2.1").unwrap();
        c.connect("R2.2", "GND").unwrap();
        // Separate group hanging off the same rail
        c.connect("VIN.Q", "R3.1").unwrap();
        c.connect("R3.2", "R4.1").unwrap();
        c.connect("R4.2", "GND").unwrap();
        c.finalize(&LogicFamily::ttl()).unwrap();
        c
    }

    #[test]
    fn test_rails_split_groups() {
        let c = divider();
        let groups = partition(&c.state);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_solver_marks_groups() {
        let mut c = divider();
        let solver = SolverDevice::new(&mut c.state, &mut c.devices, &SolverParams::default());
        assert_eq!(solver.groups().len(), 2);
        for g in solver.groups() {
            assert_eq!(c.state.net(g.nets()[0]).group, Some(g.id));
            assert_eq!(g.kind(), SolverKind::Direct);
        }
        assert!(matches!(
            c.devices[solver.device().0].model,
            DeviceModel::Solver
        ));
    }
}
