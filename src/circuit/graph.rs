//! Circuit setup: device instantiation, connections and finalisation.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use super::net::{Domain, Net, NetState, TerminalKind};
use super::types::{DeviceId, NetId, TerminalId};
use super::validate::validate_circuit;
use crate::devices::{
    AtoD, Callback, Device, DeviceBuilder, DeviceModel, DeviceRegistry, DtoA, LogicFamily,
    ModelDef, Params, Probe,
};
use crate::dsl::NetlistAst;
use crate::error::{NetlistError, Result};
use crate::time::Time;

/// Instance name of the built-in ground rail.
pub const GND: &str = "GND";

/// Longest alias chain followed before giving up.
const MAX_ALIAS_DEPTH: usize = 32;

/// Device, pin and alias names of a circuit.
#[derive(Debug, Clone, Default)]
pub struct Names {
    pub devices: HashMap<String, DeviceId>,
    pub pins: HashMap<String, TerminalId>,
    pub aliases: HashMap<String, String>,
}

impl Names {
    /// Find a device by instance name.
    pub fn device(&self, name: &str) -> Result<DeviceId> {
        self.devices
            .get(name)
            .copied()
            .ok_or_else(|| NetlistError::DeviceNotFound {
                name: name.to_string(),
            })
    }

    /// Find a terminal by `device.pin` name or alias.
    pub fn resolve(&self, name: &str) -> Result<TerminalId> {
        let mut current = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            if let Some(&t) = self.pins.get(current) {
                return Ok(t);
            }
            match self.aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        Err(NetlistError::pin_not_found(name))
    }
}

/// A netlist under construction.
///
/// Devices are added and wired up, then [`finalize`](Circuit::finalize)
/// settles net domains and inserts proxies so the result can be handed to
/// the [`Simulator`](crate::Simulator).
#[derive(Debug)]
pub struct Circuit {
    pub state: NetState,
    pub devices: Vec<Device>,
    pub names: Names,
    pub models: HashMap<String, ModelDef>,
    registry: DeviceRegistry,
    gnd: TerminalId,
    next_internal: usize,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit using the built-in device library.
    pub fn new() -> Self {
        Self::with_registry(DeviceRegistry::with_defaults())
    }

    /// Create an empty circuit resolving class names through `registry`.
    pub fn with_registry(registry: DeviceRegistry) -> Self {
        let mut circuit = Self {
            state: NetState::new(),
            devices: Vec::new(),
            names: Names::default(),
            models: HashMap::new(),
            registry,
            gnd: TerminalId(0),
            next_internal: 0,
        };
        let built = circuit.add_device_with(GND, GND, |b| {
            crate::devices::sources::ground(b, &Params::new())
        });
        if let Ok(id) = built {
            if let Ok(q) = circuit.names.resolve("GND.Q") {
                circuit.gnd = q;
            }
            circuit.names.aliases.insert("0".into(), "GND.Q".into());
            circuit.names.aliases.insert(GND.into(), "GND.Q".into());
            debug!("ground rail is device {}", id);
        }
        circuit
    }

    /// Build a circuit from a parsed netlist.
    pub fn from_ast(ast: &NetlistAst, registry: DeviceRegistry) -> Result<Self> {
        let mut circuit = Self::with_registry(registry);

        for card in &ast.models {
            circuit.add_model(card.model.clone())?;
        }

        let mut overrides: HashMap<&str, Params> = HashMap::new();
        for p in &ast.params {
            if !ast.devices.iter().any(|d| d.name == p.device) {
                return Err(NetlistError::parse(
                    p.line,
                    format!("'.param' for unknown device '{}'", p.device),
                ));
            }
            overrides
                .entry(p.device.as_str())
                .or_default()
                .set(&p.param, p.value.clone());
        }

        for def in &ast.devices {
            let class = circuit.registry.get(&def.class)?.clone();
            if def.values.len() > class.params.len() {
                return Err(NetlistError::parse(
                    def.line,
                    format!(
                        "{} takes at most {} positional values",
                        class.name,
                        class.params.len()
                    ),
                ));
            }
            if def.pins.len() > class.pins.len() {
                return Err(NetlistError::parse(
                    def.line,
                    format!("{} has only {} pins", class.name, class.pins.len()),
                ));
            }
            let mut params = Params::new();
            for (name, &value) in class.params.iter().zip(&def.values) {
                params.set(name, value);
            }
            params.merge(&def.params);
            if let Some(o) = overrides.get(def.name.as_str()) {
                params.merge(o);
            }
            circuit.add_device(&def.class, &def.name, &params)?;
        }

        for a in &ast.aliases {
            circuit.alias(&a.alias, &a.pin)?;
        }

        for def in &ast.devices {
            let class = circuit.registry.get(&def.class)?;
            let pins: Vec<String> = class
                .pins
                .iter()
                .take(def.pins.len())
                .map(|pin| format!("{}.{}", def.name, pin))
                .collect();
            for (pin, target) in pins.iter().zip(&def.pins) {
                circuit.connect(pin, target)?;
            }
        }

        for c in &ast.connections {
            if c.pins.len() < 2 {
                return Err(NetlistError::parse(c.line, "'.connect' needs two or more pins"));
            }
            for other in &c.pins[1..] {
                circuit.connect(&c.pins[0], other)?;
            }
        }

        for p in &ast.probes {
            circuit.add_probe(&p.pin)?;
        }

        info!(
            "built circuit: {} devices, {} models",
            circuit.devices.len(),
            circuit.models.len()
        );
        Ok(circuit)
    }

    /// Register a model card.
    pub fn add_model(&mut self, model: ModelDef) -> Result<()> {
        if self.models.contains_key(&model.name) {
            return Err(NetlistError::DuplicateModel { name: model.name });
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Instantiate a device of a registered class.
    pub fn add_device(&mut self, class: &str, name: &str, params: &Params) -> Result<DeviceId> {
        let constructor = self.registry.get(class)?.constructor;
        let class_name = class.to_string();
        self.add_device_with(name, &class_name, |b| constructor(b, params))
    }

    fn add_device_with<F>(&mut self, name: &str, class: &str, construct: F) -> Result<DeviceId>
    where
        F: FnOnce(&mut DeviceBuilder<'_>) -> Result<DeviceModel>,
    {
        if self.names.devices.contains_key(name) {
            return Err(NetlistError::DuplicateDevice {
                name: name.to_string(),
            });
        }
        let id = DeviceId(self.devices.len());
        let (terminals, nets) = (self.state.terminals.len(), self.state.nets.len());
        let built = {
            let mut b = DeviceBuilder::new(
                &mut self.state,
                &mut self.names.pins,
                &self.models,
                id,
                name,
            );
            construct(&mut b)
        };
        let model = match built {
            Ok(model) => model,
            Err(e) => {
                // drop whatever the failed constructor registered
                self.state.terminals.truncate(terminals);
                self.state.nets.truncate(nets);
                self.names.pins.retain(|_, t| t.0 < terminals);
                return Err(e);
            }
        };
        self.devices.push(Device::new(name, class, model));
        self.names.devices.insert(name.to_string(), id);
        debug!("added {} {}", class, name);
        Ok(id)
    }

    fn internal_name(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{}{}", prefix, self.next_internal);
            self.next_internal += 1;
            if !self.names.devices.contains_key(&name) {
                return name;
            }
        }
    }

    /// Give a pin an alternative name.
    pub fn alias(&mut self, alias: &str, pin: &str) -> Result<()> {
        if self.names.pins.contains_key(alias) || self.names.aliases.contains_key(alias) {
            return Err(NetlistError::DuplicatePin {
                name: alias.to_string(),
            });
        }
        self.names.aliases.insert(alias.to_string(), pin.to_string());
        Ok(())
    }

    /// Find a terminal by pin name or alias.
    pub fn resolve(&self, pin: &str) -> Result<TerminalId> {
        self.names.resolve(pin)
    }

    /// Find a device by instance name.
    pub fn device(&self, name: &str) -> Result<DeviceId> {
        self.names.device(name)
    }

    /// Put two pins on the same net.
    pub fn connect(&mut self, a: &str, b: &str) -> Result<NetId> {
        let ta = self.resolve(a)?;
        let tb = self.resolve(b)?;
        self.state.connect(ta, tb)
    }

    /// Terminal of the ground rail.
    pub fn ground(&self) -> TerminalId {
        self.gnd
    }

    /// Record every change of a pin as an observation labelled with the pin
    /// name.
    pub fn add_probe(&mut self, pin: &str) -> Result<DeviceId> {
        let target = self.resolve(pin)?;
        let name = self.internal_name("_PROBE");
        let label = pin.to_string();
        let id = self.add_device_with(&name, "PROBE", |b| {
            Ok(DeviceModel::Probe(Probe::build(b, label)?))
        })?;
        let input = self.names.resolve(&format!("{}.I", name))?;
        self.state.connect(target, input)?;
        Ok(id)
    }

    /// Call `func` with the time and value whenever a pin's net changes.
    pub fn add_callback<F>(&mut self, pin: &str, func: F) -> Result<DeviceId>
    where
        F: FnMut(Time, f64) + Send + 'static,
    {
        let target = self.resolve(pin)?;
        let name = self.internal_name("_CALLBACK");
        let id = self.add_device_with(&name, "CALLBACK", |b| {
            Ok(DeviceModel::Callback(Callback::build(b, Box::new(func))?))
        })?;
        let input = self.names.resolve(&format!("{}.I", name))?;
        self.state.connect(target, input)?;
        Ok(id)
    }

    /// Settle net domains and insert domain proxies.
    ///
    /// Unconnected terminals and undriven nets become placeholder rails at
    /// 0 V / logic low. Calling this more than once is harmless.
    pub fn finalize(&mut self, family: &LogicFamily) -> Result<()> {
        validate_circuit(self)?;
        self.connect_placeholders();
        self.settle_domains();
        self.insert_proxies(family)?;
        let solved = self.state.nets.iter().filter(|n| n.is_solved()).count();
        info!(
            "finalized: {} devices, {} nets, {} solved",
            self.devices.len(),
            self.state.nets.iter().filter(|n| !n.terminals.is_empty()).count(),
            solved
        );
        Ok(())
    }

    fn connect_placeholders(&mut self) {
        for i in 0..self.state.terminals.len() {
            let t = TerminalId(i);
            if self.state.net_of(t).is_connected() {
                continue;
            }
            let term = self.state.terminal(t);
            let domain = match term.domain {
                Domain::Logic => Domain::Logic,
                _ => Domain::Analog,
            };
            if term.kind == TerminalKind::Terminal {
                error!("{} is not connected, treating it as a 0V rail", term.name);
            } else {
                warn!("{} is not connected", term.name);
            }
            let mut net = Net::new(term.name.clone(), domain);
            net.placeholder = true;
            let id = self.state.add_net(net);
            self.state.attach(t, id);
        }
    }

    fn settle_domains(&mut self) {
        let NetState { nets, terminals } = &mut self.state;
        for net in nets.iter_mut() {
            if net.terminals.is_empty() {
                continue;
            }
            if let Some(d) = net.driver {
                net.domain = match terminals[d.0].domain {
                    Domain::Logic => Domain::Logic,
                    _ => Domain::Analog,
                };
            } else if net
                .terminals
                .iter()
                .any(|t| terminals[t.0].kind == TerminalKind::Terminal)
            {
                net.domain = Domain::Analog;
            } else if !net.placeholder {
                let logic = net
                    .terminals
                    .iter()
                    .any(|t| terminals[t.0].domain == Domain::Logic);
                net.domain = if logic { Domain::Logic } else { Domain::Analog };
                net.placeholder = true;
                warn!("net {} has no driver", net.name);
            }
        }
    }

    /// Insert A→D and D→A proxies where logic and analog terminals share a
    /// net. Existing proxies are reused.
    pub fn insert_proxies(&mut self, family: &LogicFamily) -> Result<()> {
        let count = self.state.nets.len();
        for i in 0..count {
            let net = NetId(i);
            let n = self.state.net(net);
            if n.terminals.is_empty() || n.placeholder {
                continue;
            }
            if n.is_logic() {
                let analog: Vec<TerminalId> = n
                    .terminals
                    .iter()
                    .copied()
                    .filter(|&t| {
                        let term = self.state.terminal(t);
                        term.kind == TerminalKind::Terminal
                            || (term.kind == TerminalKind::Input && term.domain == Domain::Analog)
                    })
                    .collect();
                if !analog.is_empty() {
                    let target = self.dtoa_net(net, family)?;
                    for t in analog {
                        self.state.move_terminal(t, target);
                    }
                }
            } else {
                let logic: Vec<TerminalId> = n
                    .terminals
                    .iter()
                    .copied()
                    .filter(|&t| {
                        let term = self.state.terminal(t);
                        term.kind == TerminalKind::Input && term.domain == Domain::Logic
                    })
                    .collect();
                if !logic.is_empty() {
                    let target = self.atod_net(net, family)?;
                    for t in logic {
                        self.state.move_terminal(t, target);
                    }
                }
            }
        }
        Ok(())
    }

    /// Analog side of the D→A proxy on a logic net, created on first use.
    fn dtoa_net(&mut self, net: NetId, family: &LogicFamily) -> Result<NetId> {
        if let Some(DeviceModel::DtoA(p)) = self.proxy_model(net) {
            return Ok(self.state.net_of(p.p));
        }
        let name = self.internal_name("_DA");
        let fam = family.clone();
        let id = self.add_device_with(&name, "PROXY_DA", |b| {
            Ok(DeviceModel::DtoA(DtoA::build(b, fam)?))
        })?;
        let input = self.names.resolve(&format!("{}.I", name))?;
        let p = self.names.resolve(&format!("{}.Q", name))?;
        let n = self.names.resolve(&format!("{}.GND", name))?;
        self.state.attach(input, net);
        let analog_name = format!("{}.A", self.state.net(net).name);
        let analog = self.state.add_net(Net::new(analog_name, Domain::Analog));
        self.state.attach(p, analog);
        self.state.connect(self.gnd, n)?;
        self.state.net_mut(net).proxy = Some(id);
        self.state.net_mut(analog).proxy = Some(id);
        debug!("inserted {} on net {}", name, self.state.net(net).name);
        Ok(analog)
    }

    /// Logic side of the A→D proxy on an analog net, created on first use.
    fn atod_net(&mut self, net: NetId, family: &LogicFamily) -> Result<NetId> {
        if let Some(DeviceModel::AtoD(p)) = self.proxy_model(net) {
            return Ok(self.state.net_of(p.output));
        }
        let name = self.internal_name("_AD");
        let fam = family.clone();
        let id = self.add_device_with(&name, "PROXY_AD", |b| {
            Ok(DeviceModel::AtoD(AtoD::build(b, fam)?))
        })?;
        let input = self.names.resolve(&format!("{}.I", name))?;
        let output = self.names.resolve(&format!("{}.Q", name))?;
        self.state.attach(input, net);
        self.state.net_mut(net).proxy = Some(id);
        debug!("inserted {} on net {}", name, self.state.net(net).name);
        Ok(self.state.net_of(output))
    }

    fn proxy_model(&self, net: NetId) -> Option<&DeviceModel> {
        self.state
            .net(net)
            .proxy
            .map(|id| &self.devices[id.0].model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params::new()
    }

    #[test]
    fn test_ground_aliases() {
        let c = Circuit::new();
        assert_eq!(c.resolve("GND").unwrap(), c.ground());
        assert_eq!(c.resolve("0").unwrap(), c.ground());
        assert!(matches!(
            c.resolve("X.Q"),
            Err(NetlistError::PinNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_device_rejected() {
        let mut c = Circuit::new();
        c.add_device("RES", "R1", &params()).unwrap();
        assert!(matches!(
            c.add_device("RES", "R1", &params()),
            Err(NetlistError::DuplicateDevice { .. })
        ));
        assert!(matches!(
            c.add_device("NOPE", "X1", &params()),
            Err(NetlistError::UnknownDeviceClass { .. })
        ));
    }

    #[test]
    fn test_failed_constructor_leaves_no_pins() {
        let mut c = Circuit::new();
        let bad = Params::new().with("R", -5.0);
        assert!(c.add_device("RES", "R1", &bad).is_err());
        assert!(c.resolve("R1.1").is_err());
        c.add_device("RES", "R1", &params()).unwrap();
        assert!(c.resolve("R1.1").is_ok());
    }

    #[test]
    fn test_alias_chain() {
        let mut c = Circuit::new();
        c.add_device("LOGIC_INPUT", "IN1", &params()).unwrap();
        c.alias("A", "IN1.Q").unwrap();
        c.alias("B", "A").unwrap();
        assert_eq!(c.resolve("B").unwrap(), c.resolve("IN1.Q").unwrap());
        assert!(c.alias("A", "IN1.Q").is_err());
    }

    #[test]
    fn test_proxies_inserted_once() {
        let mut c = Circuit::new();
        c.add_device("LOGIC_INPUT", "IN1", &params()).unwrap();
        c.add_device("RES", "R1", &params()).unwrap();
        c.add_device("ANALOG_INPUT", "V1", &params()).unwrap();
        c.add_device("TTL_7404_INVERT", "U1", &params()).unwrap();
        c.connect("IN1.Q", "R1.1").unwrap();
        c.connect("R1.2", "GND").unwrap();
        c.connect("V1.Q", "U1.A").unwrap();

        let family = LogicFamily::ttl();
        c.finalize(&family).unwrap();
        let count = c.devices.len();
        assert_eq!(
            c.devices
                .iter()
                .filter(|d| matches!(d.model, DeviceModel::DtoA(_) | DeviceModel::AtoD(_)))
                .count(),
            2
        );

        c.insert_proxies(&family).unwrap();
        c.finalize(&family).unwrap();
        assert_eq!(c.devices.len(), count);

        // the resistor now hangs off the proxy's analog node
        let r1 = c.resolve("R1.1").unwrap();
        let net = c.state.net(c.state.net_of(r1));
        assert!(net.is_solved());
        // the inverter input reads the proxy's logic output
        let a = c.resolve("U1.A").unwrap();
        assert!(c.state.net(c.state.net_of(a)).is_logic());
    }

    #[test]
    fn test_existing_proxy_reused() {
        let mut c = Circuit::new();
        c.add_device("LOGIC_INPUT", "IN1", &params()).unwrap();
        c.add_device("RES", "R1", &params()).unwrap();
        c.add_device("RES", "R2", &params()).unwrap();
        c.connect("IN1.Q", "R1.1").unwrap();
        let family = LogicFamily::ttl();
        c.finalize(&family).unwrap();
        let count = c.devices.len();

        c.connect("IN1.Q", "R2.1").unwrap();
        c.insert_proxies(&family).unwrap();
        assert_eq!(c.devices.len(), count);
        let r1 = c.state.net_of(c.resolve("R1.1").unwrap());
        let r2 = c.state.net_of(c.resolve("R2.1").unwrap());
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_unconnected_pins_become_placeholders() {
        let mut c = Circuit::new();
        c.add_device("TTL_7400_NAND", "U1", &params()).unwrap();
        c.finalize(&LogicFamily::ttl()).unwrap();
        let a = c.resolve("U1.A").unwrap();
        let net = c.state.net(c.state.net_of(a));
        assert!(net.placeholder);
        assert!(net.is_logic());
    }

    #[test]
    fn test_empty_circuit_rejected() {
        let mut c = Circuit::new();
        assert!(matches!(
            c.finalize(&LogicFamily::ttl()),
            Err(NetlistError::InvalidTopology { .. })
        ));
    }
}
