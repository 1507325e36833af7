//! Pin registration for device constructors.

use std::collections::HashMap;

use crate::circuit::{DeviceId, Domain, InputState, Net, NetState, TerminalId, TerminalKind};
use crate::error::{NetlistError, Result};

use super::params::ModelDef;

/// Handed to a device constructor so it can register its pins.
///
/// Every public pin is reachable as `<device>.<pin>`.
pub struct DeviceBuilder<'a> {
    state: &'a mut NetState,
    pins: &'a mut HashMap<String, TerminalId>,
    models: &'a HashMap<String, ModelDef>,
    device: DeviceId,
    name: String,
}

impl<'a> DeviceBuilder<'a> {
    pub fn new(
        state: &'a mut NetState,
        pins: &'a mut HashMap<String, TerminalId>,
        models: &'a HashMap<String, ModelDef>,
        device: DeviceId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            state,
            pins,
            models,
            device,
            name: name.into(),
        }
    }

    /// Instance name of the device being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the device being built.
    pub fn id(&self) -> DeviceId {
        self.device
    }

    fn qualified(&self, pin: &str) -> String {
        format!("{}.{}", self.name, pin)
    }

    fn create(&mut self, pin: &str, kind: TerminalKind, domain: Domain) -> TerminalId {
        let terminal = crate::circuit::Terminal::new(self.qualified(pin), self.device, kind, domain);
        self.state.add_terminal(terminal)
    }

    fn register(&mut self, pin: &str, terminal: TerminalId) -> Result<TerminalId> {
        let full = self.qualified(pin);
        if self.pins.contains_key(&full) {
            return Err(NetlistError::DuplicatePin { name: full });
        }
        self.pins.insert(full, terminal);
        Ok(terminal)
    }

    /// Register a logic input that triggers on every change.
    pub fn logic_input(&mut self, pin: &str) -> Result<TerminalId> {
        self.logic_input_with(pin, InputState::Active)
    }

    /// Register a logic input with an initial activity filter.
    pub fn logic_input_with(&mut self, pin: &str, state: InputState) -> Result<TerminalId> {
        let t = self.create(pin, TerminalKind::Input, Domain::Logic);
        self.state.terminal_mut(t).state = state;
        self.register(pin, t)
    }

    /// Register an analog input.
    pub fn analog_input(&mut self, pin: &str) -> Result<TerminalId> {
        let t = self.create(pin, TerminalKind::Input, Domain::Analog);
        self.register(pin, t)
    }

    /// Register an input that reads either domain without a proxy.
    pub fn any_input(&mut self, pin: &str) -> Result<TerminalId> {
        let t = self.create(pin, TerminalKind::Input, Domain::Any);
        self.register(pin, t)
    }

    /// Register a logic output. The output gets its own net.
    pub fn logic_output(&mut self, pin: &str, initial: bool) -> Result<TerminalId> {
        let t = self.create(pin, TerminalKind::Output, Domain::Logic);
        let mut net = Net::new(self.qualified(pin), Domain::Logic);
        net.driver = Some(t);
        net.init_logic(initial);
        let id = self.state.add_net(net);
        self.state.attach(t, id);
        self.register(pin, t)
    }

    /// Register an analog output. The output gets its own net.
    pub fn analog_output(&mut self, pin: &str, initial: f64) -> Result<TerminalId> {
        let t = self.create(pin, TerminalKind::Output, Domain::Analog);
        let mut net = Net::new(self.qualified(pin), Domain::Analog);
        net.driver = Some(t);
        net.init_analog(initial);
        let id = self.state.add_net(net);
        self.state.attach(t, id);
        self.register(pin, t)
    }

    /// Register the two ends of a branch.
    pub fn terminal_pair(&mut self, p: &str, n: &str) -> Result<(TerminalId, TerminalId)> {
        let (tp, tn) = self.internal_pair(p, n);
        self.register(p, tp)?;
        self.register(n, tn)?;
        Ok((tp, tn))
    }

    /// Create the two ends of a branch without exposing them as pins.
    pub fn internal_pair(&mut self, p: &str, n: &str) -> (TerminalId, TerminalId) {
        let tp = self.create(p, TerminalKind::Terminal, Domain::Analog);
        let tn = self.create(n, TerminalKind::Terminal, Domain::Analog);
        self.state.terminal_mut(tp).other = Some(tn);
        self.state.terminal_mut(tn).other = Some(tp);
        (tp, tn)
    }

    /// Expose an existing terminal under a pin name.
    pub fn expose(&mut self, pin: &str, terminal: TerminalId) -> Result<TerminalId> {
        self.register(pin, terminal)
    }

    /// Tie two of this device's terminals to the same node.
    pub fn join(&mut self, a: TerminalId, b: TerminalId) -> Result<()> {
        self.state.connect(a, b).map(|_| ())
    }

    /// Feed an output back into one of the device's own inputs.
    pub fn link(&mut self, output: TerminalId, input: TerminalId) -> Result<()> {
        self.join(output, input)
    }

    /// Look up a model card.
    pub fn model(&self, name: &str) -> Result<&ModelDef> {
        self.models
            .get(name)
            .ok_or_else(|| NetlistError::UndefinedModel {
                model: name.to_string(),
                device: self.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_registration() {
        let mut state = NetState::new();
        let mut pins = HashMap::new();
        let models = HashMap::new();
        let mut b = DeviceBuilder::new(&mut state, &mut pins, &models, DeviceId(0), "U1");

        let a = b.logic_input("A").unwrap();
        let q = b.logic_output("Q", true).unwrap();
        assert!(b.logic_input("A").is_err());
        assert!(b.model("missing").is_err());
        drop(b);

        assert_eq!(pins["U1.A"], a);
        assert_eq!(pins["U1.Q"], q);
        let net = state.net(state.net_of(q));
        assert_eq!(net.driver, Some(q));
        assert!(net.q);
        assert!(!state.net_of(a).is_connected());
    }

    #[test]
    fn test_terminal_pair_partners() {
        let mut state = NetState::new();
        let mut pins = HashMap::new();
        let models = HashMap::new();
        let mut b = DeviceBuilder::new(&mut state, &mut pins, &models, DeviceId(3), "R1");
        let (p, n) = b.terminal_pair("1", "2").unwrap();
        drop(b);

        assert_eq!(state.terminal(p).other, Some(n));
        assert_eq!(state.terminal(n).other, Some(p));
        assert_eq!(state.terminal(p).kind, TerminalKind::Terminal);
        assert_eq!(state.terminal(n).device, DeviceId(3));
    }
}
