//! Main simulator interface.
//!
//! The [`Simulator`] owns a finalised circuit, its event queue and the
//! matrix solver, and advances them together through simulated time:
//!
//! 1. pop the earliest net event and apply it,
//! 2. collect the inputs whose activity filter accepts the change,
//! 3. run the owning devices' updates, which schedule further events,
//! 4. turn solve demands into solver events at the current time.

mod context;

pub use context::UpdateContext;

use tracing::{debug, info, trace};

use crate::circuit::{Circuit, DeviceId, GroupId, NetId, NetState, Names, TerminalId, TerminalKind};
use crate::devices::{Device, LogicFamily, Observation};
use crate::error::Result;
use crate::scheduler::EventQueue;
use crate::solver::{SolverDevice, SolverParams, SolverStats};
use crate::time::Time;

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Matrix solver settings
    pub solver: SolverParams,
    /// Thresholds and output stages of inserted proxies
    pub logic_family: LogicFamily,
    /// Delay applied to externally injected input changes
    pub input_delay: Time,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            solver: SolverParams::default(),
            logic_family: LogicFamily::ttl(),
            input_delay: Time::from_nsec(1),
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the solver parameters.
    pub fn with_solver(mut self, solver: SolverParams) -> Self {
        self.solver = solver;
        self
    }

    /// Set the logic family used by proxies.
    pub fn with_logic_family(mut self, family: LogicFamily) -> Self {
        self.logic_family = family;
        self
    }

    /// Set the delay of external input changes.
    pub fn with_input_delay(mut self, delay: Time) -> Self {
        self.input_delay = delay;
        self
    }
}

/// State every device update may touch.
#[derive(Debug)]
struct Core {
    state: NetState,
    queue: EventQueue,
    solve_requests: Vec<GroupId>,
    observations: Vec<Observation>,
}

impl Core {
    fn context<'a>(&'a mut self, config: &'a SimulatorConfig) -> UpdateContext<'a> {
        UpdateContext {
            state: &mut self.state,
            queue: &mut self.queue,
            solve_requests: &mut self.solve_requests,
            observations: &mut self.observations,
            params: &config.solver,
            input_delay: config.input_delay,
        }
    }
}

/// The event-driven mixed-signal simulator.
#[derive(Debug)]
pub struct Simulator {
    core: Core,
    devices: Vec<Device>,
    solver: SolverDevice,
    names: Names,
    /// Net state right after setup, restored by `reset`
    initial: NetState,
    config: SimulatorConfig,
    /// Inputs triggered by the event being processed
    triggered: Vec<TerminalId>,
    events: u64,
}

impl Simulator {
    /// Finalise `circuit`, set up the solver and bring everything to its
    /// power-on state at t = 0.
    pub fn new(mut circuit: Circuit, config: SimulatorConfig) -> Result<Self> {
        circuit.finalize(&config.logic_family)?;
        let Circuit {
            mut state,
            mut devices,
            names,
            ..
        } = circuit;

        let solver = SolverDevice::new(&mut state, &mut devices, &config.solver);
        let queue = EventQueue::new(state.nets.len());
        let mut sim = Self {
            initial: state.clone(),
            core: Core {
                state,
                queue,
                solve_requests: Vec::new(),
                observations: Vec::new(),
            },
            devices,
            solver,
            names,
            config,
            triggered: Vec::new(),
            events: 0,
        };
        sim.reset();
        Ok(sim)
    }

    /// Return to t = 0 with every net, device and solver group in its
    /// power-on state.
    pub fn reset(&mut self) {
        self.core.state = self.initial.clone();
        self.core.queue.clear();
        self.core.solve_requests.clear();
        self.core.observations.clear();
        self.events = 0;

        {
            let mut ctx = self.core.context(&self.config);
            for device in &mut self.devices {
                device.reset(&mut ctx);
            }
        }
        self.solver
            .reset(&mut self.core.state, &mut self.devices, &mut self.core.queue);
        {
            let mut ctx = self.core.context(&self.config);
            for device in &mut self.devices {
                device.update(&mut ctx, None);
            }
        }
        self.drain_solve_requests();

        info!(
            "reset: {} devices, {} nets, {} solver groups",
            self.devices.len(),
            self.core.state.nets.len(),
            self.solver.groups().len()
        );
    }

    /// Current simulation time.
    pub fn time(&self) -> Time {
        self.core.queue.now()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Nets and terminals of the running circuit.
    pub fn state(&self) -> &NetState {
        &self.core.state
    }

    /// Device, pin and alias names.
    pub fn names(&self) -> &Names {
        &self.names
    }

    pub fn solver(&self) -> &SolverDevice {
        &self.solver
    }

    /// Find a device by instance name.
    pub fn device(&self, name: &str) -> Result<&Device> {
        let id = self.names.device(name)?;
        Ok(&self.devices[id.0])
    }

    /// Number of events processed since the last reset.
    pub fn event_count(&self) -> u64 {
        self.events
    }

    /// Process the earliest pending event. Returns its time, or `None` when
    /// the simulation is idle.
    pub fn step(&mut self) -> Option<Time> {
        let (time, net) = self.core.queue.pop_next()?;
        self.events += 1;
        self.process(net);
        Some(time)
    }

    /// Process every event up to and including `end`, then move the clock
    /// to `end`.
    pub fn run_until(&mut self, end: Time) {
        while let Some(t) = self.core.queue.peek_time() {
            if t > end {
                break;
            }
            self.step();
        }
        self.core.queue.advance_to(end);
    }

    /// Run for `duration` past the current time.
    pub fn run_for(&mut self, duration: Time) {
        let end = self.time() + duration;
        self.run_until(end);
    }

    fn process(&mut self, net: NetId) {
        let mut triggered = std::mem::take(&mut self.triggered);
        triggered.clear();

        let state = &mut self.core.state;
        let n = state.net(net);
        if n.is_solved() {
            let n = state.net_mut(net);
            n.last = n.cur;
            collect_inputs(state, net, &mut triggered, |s| s.fires_analog());
        } else if n.is_logic() {
            if n.new_q == n.q {
                trace!("{}: glitch at {} swallowed", n.name, self.core.queue.now());
                self.triggered = triggered;
                return;
            }
            let (old, new) = (n.q, n.new_q);
            let n = state.net_mut(net);
            n.q = new;
            n.cur = if new { 1.0 } else { 0.0 };
            n.last = n.cur;
            collect_inputs(state, net, &mut triggered, |s| s.fires(old, new));
        } else {
            let n = state.net_mut(net);
            n.cur = n.new_v;
            n.last = n.cur;
            for &t in &state.net(net).terminals {
                let term = state.terminal(t);
                if term.kind != TerminalKind::Terminal {
                    continue;
                }
                let group = term.other.and_then(|o| state.net(state.net_of(o)).group);
                if let Some(g) = group {
                    if !self.core.solve_requests.contains(&g) {
                        self.core.solve_requests.push(g);
                    }
                }
            }
            collect_inputs(state, net, &mut triggered, |s| s.fires_analog());
        }

        for &t in &triggered {
            self.dispatch(t);
        }
        self.triggered = triggered;
        self.drain_solve_requests();
    }

    fn dispatch(&mut self, terminal: TerminalId) {
        let device = self.core.state.terminal(terminal).device;
        if device == self.solver.device() {
            self.solver.update(
                terminal,
                &mut self.core.state,
                &mut self.devices,
                &mut self.core.queue,
            );
        } else {
            let mut ctx = self.core.context(&self.config);
            self.devices[device.0].update(&mut ctx, Some(terminal));
        }
    }

    fn drain_solve_requests(&mut self) {
        let mut requests = std::mem::take(&mut self.core.solve_requests);
        for &g in &requests {
            self.solver
                .request(g, &mut self.core.state, &mut self.core.queue);
        }
        requests.clear();
        self.core.solve_requests = requests;
    }

    /// Change a device parameter while the simulation runs, e.g. `IN` of a
    /// `LOGIC_INPUT` or `R` of a `RES`.
    pub fn set_param(&mut self, device: &str, param: &str, value: f64) -> Result<()> {
        let id = self.names.device(device)?;
        self.update_param(id, param, value)
    }

    fn update_param(&mut self, id: DeviceId, param: &str, value: f64) -> Result<()> {
        {
            let mut ctx = self.core.context(&self.config);
            self.devices[id.0].update_param(&mut ctx, param, value)?;
        }
        debug!(
            "{}.{} = {} at {}",
            self.devices[id.0].name,
            param,
            value,
            self.time()
        );
        self.drain_solve_requests();
        Ok(())
    }

    /// Drive a `LOGIC_INPUT` device. The change lands after the input delay.
    pub fn set_logic_input(&mut self, device: &str, value: bool) -> Result<()> {
        self.set_param(device, "IN", if value { 1.0 } else { 0.0 })
    }

    /// Drive an `ANALOG_INPUT` device. The change lands after the input delay.
    pub fn set_analog_input(&mut self, device: &str, value: f64) -> Result<()> {
        self.set_param(device, "IN", value)
    }

    /// Remove and return everything recorded by probes so far.
    pub fn take_observations(&mut self) -> Vec<Observation> {
        std::mem::take(&mut self.core.observations)
    }

    /// Counters of every solver group, indexed by group.
    pub fn solver_stats(&self) -> Vec<SolverStats> {
        self.solver.stats()
    }

    /// Log the solver counters at debug level.
    pub fn log_solver_stats(&self) {
        self.solver.log_stats();
    }

    /// Logic level seen at a pin.
    pub fn logic(&self, pin: &str) -> Result<bool> {
        let t = self.names.resolve(pin)?;
        Ok(self.core.state.logic(t))
    }

    /// Voltage seen at a pin.
    pub fn voltage(&self, pin: &str) -> Result<f64> {
        let t = self.names.resolve(pin)?;
        Ok(self.core.state.analog(t))
    }
}

/// Push the inputs on `net` whose filter accepts the change.
fn collect_inputs<F>(state: &NetState, net: NetId, out: &mut Vec<TerminalId>, fires: F)
where
    F: Fn(crate::circuit::InputState) -> bool,
{
    for &t in &state.net(net).terminals {
        let term = state.terminal(t);
        if term.kind == TerminalKind::Input && fires(term.state) {
            out.push(t);
        }
    }
}
