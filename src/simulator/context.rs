//! The view of the simulation a device gets while it updates.

use tracing::error;

use crate::circuit::{GroupId, InputState, NetState, TerminalId};
use crate::devices::Observation;
use crate::scheduler::EventQueue;
use crate::solver::SolverParams;
use crate::time::Time;

/// Mutable access to nets, terminals and the event queue for one device
/// update. Outputs are scheduled, never applied in place, so an update can
/// not observe its own effects.
pub struct UpdateContext<'a> {
    pub(crate) state: &'a mut NetState,
    pub(crate) queue: &'a mut EventQueue,
    pub(crate) solve_requests: &'a mut Vec<GroupId>,
    pub(crate) observations: &'a mut Vec<Observation>,
    pub(crate) params: &'a SolverParams,
    pub(crate) input_delay: Time,
}

impl<'a> UpdateContext<'a> {
    /// Current simulation time.
    pub fn time(&self) -> Time {
        self.queue.now()
    }

    /// Solver parameters of this simulation.
    pub fn params(&self) -> &SolverParams {
        self.params
    }

    /// Delay applied to externally injected input changes.
    pub fn input_delay(&self) -> Time {
        self.input_delay
    }

    /// Logic level on a terminal's net.
    pub fn logic(&self, terminal: TerminalId) -> bool {
        self.state.logic(terminal)
    }

    /// Voltage on a terminal's net.
    pub fn analog(&self, terminal: TerminalId) -> f64 {
        self.state.analog(terminal)
    }

    /// Schedule a logic output to `value` after `delay`.
    ///
    /// Nothing is scheduled when `value` equals the value already scheduled.
    pub fn set_logic(&mut self, output: TerminalId, value: bool, delay: Time) {
        let net = self.state.net_of(output);
        let n = self.state.net_mut(net);
        if n.new_q == value {
            return;
        }
        n.new_q = value;
        if let Err(e) = self.queue.reschedule(net, delay) {
            error!("{}: {}", self.state.terminal(output).name, e);
        }
    }

    /// Schedule an analog output to `value` after `delay`.
    pub fn set_analog(&mut self, output: TerminalId, value: f64, delay: Time) {
        let net = self.state.net_of(output);
        let n = self.state.net_mut(net);
        if (n.new_v - value).abs() < self.params.accuracy {
            return;
        }
        n.new_v = value;
        if let Err(e) = self.queue.reschedule(net, delay) {
            error!("{}: {}", self.state.terminal(output).name, e);
        }
    }

    /// Set a logic output immediately. Only meaningful during reset.
    pub fn force_logic(&mut self, output: TerminalId, value: bool) {
        let net = self.state.net_of(output);
        self.state.net_mut(net).init_logic(value);
    }

    /// Set an analog output immediately. Only meaningful during reset.
    pub fn force_analog(&mut self, output: TerminalId, value: f64) {
        let net = self.state.net_of(output);
        self.state.net_mut(net).init_analog(value);
    }

    /// Make an input trigger on every change.
    pub fn activate(&mut self, input: TerminalId) {
        self.state.terminal_mut(input).state = InputState::Active;
    }

    /// Make an input trigger on rising edges only.
    pub fn activate_lh(&mut self, input: TerminalId) {
        self.state.terminal_mut(input).state = InputState::LowToHigh;
    }

    /// Make an input trigger on falling edges only.
    pub fn activate_hl(&mut self, input: TerminalId) {
        self.state.terminal_mut(input).state = InputState::HighToLow;
    }

    /// Stop an input from triggering.
    pub fn inactivate(&mut self, input: TerminalId) {
        self.state.terminal_mut(input).state = InputState::Passive;
    }

    /// Set the raw stamp of a terminal.
    pub fn stamp(&mut self, terminal: TerminalId, gt: f64, go: f64, idr: f64) {
        self.state.terminal_mut(terminal).set_stamp(gt, go, idr);
    }

    /// Stamp a two-terminal branch whose current from `p` to `n` is
    /// `g * (Vp - Vn) + i_eq`.
    pub fn stamp_branch(&mut self, p: TerminalId, n: TerminalId, g: f64, i_eq: f64) {
        self.state.stamp_branch(p, n, g, i_eq);
    }

    /// Request a solve of the group the terminal's net belongs to.
    pub fn solve_now(&mut self, terminal: TerminalId) {
        let net = self.state.net_of(terminal);
        if let Some(group) = self.state.net(net).group {
            if !self.solve_requests.contains(&group) {
                self.solve_requests.push(group);
            }
        }
    }

    /// Record an observation.
    pub fn observe(&mut self, probe: &str, value: f64) {
        let time = self.time();
        self.observations.push(Observation {
            time,
            probe: probe.to_string(),
            value,
        });
    }
}
