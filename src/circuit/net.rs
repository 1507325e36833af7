//! Nets, terminals and the arena that owns them.

use super::types::{DeviceId, GroupId, NetId, TerminalId};
use crate::error::{NetlistError, Result};

/// How a terminal attaches to its net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// Finite impedance branch end, carries a `gt`/`go`/`idr` stamp.
    Terminal,
    /// Infinite impedance, read only.
    Input,
    /// Zero impedance driver of a rail net.
    Output,
}

/// Signal domain of a terminal or net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Two-valued logic level.
    Logic,
    /// Real-valued voltage.
    Analog,
    /// Inputs that read whatever the net carries (probes, callbacks).
    Any,
}

/// Activity filter of an input terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Never triggers an update.
    Passive,
    /// Triggers on falling edges only.
    HighToLow,
    /// Triggers on rising edges only.
    LowToHigh,
    /// Triggers on every change.
    Active,
}

impl InputState {
    /// Check if a logic transition `old -> new` passes this filter.
    pub fn fires(self, old: bool, new: bool) -> bool {
        match self {
            InputState::Passive => false,
            InputState::HighToLow => old && !new,
            InputState::LowToHigh => !old && new,
            InputState::Active => old != new,
        }
    }

    /// Check if an analog change passes this filter.
    pub fn fires_analog(self) -> bool {
        self != InputState::Passive
    }
}

/// A device-owned connection point.
#[derive(Debug, Clone)]
pub struct Terminal {
    /// Fully qualified pin name (`device.pin`)
    pub name: String,
    /// Owning device
    pub device: DeviceId,
    pub kind: TerminalKind,
    pub domain: Domain,
    /// Net this terminal is attached to
    pub net: NetId,
    /// Activity filter (inputs only)
    pub state: InputState,
    /// Partner terminal of a two-terminal branch
    pub other: Option<TerminalId>,
    /// Self conductance
    pub gt: f64,
    /// Conductance towards the partner's net
    pub go: f64,
    /// Current source term
    pub idr: f64,
}

impl Terminal {
    /// Create an unconnected terminal.
    pub fn new(name: String, device: DeviceId, kind: TerminalKind, domain: Domain) -> Self {
        Self {
            name,
            device,
            kind,
            domain,
            net: NetId::UNCONNECTED,
            state: InputState::Active,
            other: None,
            gt: 0.0,
            go: 0.0,
            idr: 0.0,
        }
    }

    /// Set the stamp of this terminal.
    pub fn set_stamp(&mut self, gt: f64, go: f64, idr: f64) {
        self.gt = gt;
        self.go = go;
        self.idr = idr;
    }
}

/// An electrical node.
#[derive(Debug, Clone)]
pub struct Net {
    pub name: String,
    /// Connected terminals in connection order
    pub terminals: Vec<TerminalId>,
    /// Zero impedance output driving this net, if any
    pub driver: Option<TerminalId>,
    pub domain: Domain,
    /// Net carries a fixed value because nothing drives or solves it
    pub placeholder: bool,
    /// Current logic value
    pub q: bool,
    /// Scheduled logic value
    pub new_q: bool,
    /// Current analog value
    pub cur: f64,
    /// Value last announced to inputs
    pub last: f64,
    /// Scheduled analog value (analog rails)
    pub new_v: f64,
    /// Solver group of a solved net
    pub group: Option<GroupId>,
    /// Proxy device bridging this net to the other domain
    pub proxy: Option<DeviceId>,
}

impl Net {
    /// Create an empty net.
    pub fn new(name: String, domain: Domain) -> Self {
        Self {
            name,
            terminals: Vec::new(),
            driver: None,
            domain,
            placeholder: false,
            q: false,
            new_q: false,
            cur: 0.0,
            last: 0.0,
            new_v: 0.0,
            group: None,
            proxy: None,
        }
    }

    /// Check if this net is a boundary value for the solver.
    pub fn is_rail(&self) -> bool {
        self.driver.is_some() || self.placeholder
    }

    /// Check if this net is an unknown of a solver group.
    pub fn is_solved(&self) -> bool {
        !self.is_rail() && self.domain == Domain::Analog
    }

    /// Check if this net carries logic values.
    pub fn is_logic(&self) -> bool {
        self.domain == Domain::Logic
    }

    /// Set the initial value of the net.
    pub fn init_logic(&mut self, value: bool) {
        self.q = value;
        self.new_q = value;
        let v = if value { 1.0 } else { 0.0 };
        self.cur = v;
        self.last = v;
        self.new_v = v;
    }

    /// Set the initial voltage of the net.
    pub fn init_analog(&mut self, value: f64) {
        self.cur = value;
        self.last = value;
        self.new_v = value;
    }
}

/// Arena of nets and terminals.
#[derive(Debug, Clone, Default)]
pub struct NetState {
    pub nets: Vec<Net>,
    pub terminals: Vec<Terminal>,
}

impl NetState {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a net and return its handle.
    pub fn add_net(&mut self, net: Net) -> NetId {
        self.nets.push(net);
        NetId(self.nets.len() - 1)
    }

    /// Add a terminal and return its handle.
    pub fn add_terminal(&mut self, terminal: Terminal) -> TerminalId {
        self.terminals.push(terminal);
        TerminalId(self.terminals.len() - 1)
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.0]
    }

    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id.0]
    }

    pub fn terminal_mut(&mut self, id: TerminalId) -> &mut Terminal {
        &mut self.terminals[id.0]
    }

    /// Net a terminal is attached to.
    pub fn net_of(&self, id: TerminalId) -> NetId {
        self.terminals[id.0].net
    }

    /// Attach an unconnected terminal to a net.
    pub fn attach(&mut self, terminal: TerminalId, net: NetId) {
        self.terminals[terminal.0].net = net;
        self.nets[net.0].terminals.push(terminal);
    }

    /// Move a terminal from its current net to another one.
    pub fn move_terminal(&mut self, terminal: TerminalId, to: NetId) {
        let from = self.net_of(terminal);
        if from.is_connected() {
            self.nets[from.0].terminals.retain(|&t| t != terminal);
        }
        self.attach(terminal, to);
    }

    /// Put two terminals on the same net, creating or merging nets as needed.
    ///
    /// Merging keeps the terminal order of `a`'s net followed by `b`'s.
    pub fn connect(&mut self, a: TerminalId, b: TerminalId) -> Result<NetId> {
        let na = self.net_of(a);
        let nb = self.net_of(b);
        match (na.is_connected(), nb.is_connected()) {
            (false, false) => {
                let domain = match self.terminal(a).domain {
                    Domain::Logic => Domain::Logic,
                    _ => Domain::Analog,
                };
                let net = self.add_net(Net::new(self.terminal(a).name.clone(), domain));
                self.attach(a, net);
                self.attach(b, net);
                Ok(net)
            }
            (true, false) => {
                self.attach(b, na);
                Ok(na)
            }
            (false, true) => {
                self.attach(a, nb);
                Ok(nb)
            }
            (true, true) => self.merge(na, nb),
        }
    }

    /// Move everything on `from` onto `into`. `from` is left empty.
    pub fn merge(&mut self, into: NetId, from: NetId) -> Result<NetId> {
        if into == from {
            return Ok(into);
        }
        if let (Some(d1), Some(d2)) = (self.net(into).driver, self.net(from).driver) {
            return Err(NetlistError::MultipleDrivers {
                net: self.net(into).name.clone(),
                first: self.terminal(d1).name.clone(),
                second: self.terminal(d2).name.clone(),
            });
        }
        let moved = std::mem::take(&mut self.nets[from.0].terminals);
        for &t in &moved {
            self.terminals[t.0].net = into;
        }
        self.nets[into.0].terminals.extend(moved);
        if let Some(driver) = self.nets[from.0].driver.take() {
            let domain = self.nets[from.0].domain;
            let target = &mut self.nets[into.0];
            target.driver = Some(driver);
            target.domain = domain;
        }
        Ok(into)
    }

    /// Logic level seen by a terminal.
    pub fn logic(&self, terminal: TerminalId) -> bool {
        let net = self.net(self.net_of(terminal));
        if net.is_logic() {
            net.q
        } else {
            net.cur > 0.5
        }
    }

    /// Voltage seen by a terminal.
    pub fn analog(&self, terminal: TerminalId) -> f64 {
        let net = self.net(self.net_of(terminal));
        if net.is_logic() {
            if net.q {
                1.0
            } else {
                0.0
            }
        } else {
            net.cur
        }
    }

    /// Stamp a two-terminal branch whose current from `p` to `n` is
    /// `g * (Vp - Vn) + i_eq`.
    pub fn stamp_branch(&mut self, p: TerminalId, n: TerminalId, g: f64, i_eq: f64) {
        self.terminals[p.0].set_stamp(g, g, -i_eq);
        self.terminals[n.0].set_stamp(g, g, i_eq);
    }

    /// Voltage of the net on the other side of a branch.
    pub fn other_analog(&self, terminal: TerminalId) -> f64 {
        match self.terminals[terminal.0].other {
            Some(other) => self.analog(other),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_state_filters() {
        assert!(InputState::Active.fires(false, true));
        assert!(InputState::Active.fires(true, false));
        assert!(InputState::LowToHigh.fires(false, true));
        assert!(!InputState::LowToHigh.fires(true, false));
        assert!(InputState::HighToLow.fires(true, false));
        assert!(!InputState::Passive.fires(false, true));
        assert!(!InputState::Passive.fires_analog());
    }

    #[test]
    fn test_move_terminal() {
        let mut state = NetState::new();
        let a = state.add_net(Net::new("a".into(), Domain::Logic));
        let b = state.add_net(Net::new("b".into(), Domain::Logic));
        let t = state.add_terminal(Terminal::new(
            "U1.A".into(),
            DeviceId(0),
            TerminalKind::Input,
            Domain::Logic,
        ));
        state.attach(t, a);
        state.move_terminal(t, b);
        assert!(state.net(a).terminals.is_empty());
        assert_eq!(state.net(b).terminals, vec![t]);
        assert_eq!(state.net_of(t), b);
    }

    fn output(state: &mut NetState, name: &str) -> TerminalId {
        let t = state.add_terminal(Terminal::new(
            name.into(),
            DeviceId(0),
            TerminalKind::Output,
            Domain::Logic,
        ));
        let mut net = Net::new(name.into(), Domain::Logic);
        net.driver = Some(t);
        let id = state.add_net(net);
        state.attach(t, id);
        t
    }

    #[test]
    fn test_connect_merges_in_order() {
        let mut state = NetState::new();
        let q = output(&mut state, "U1.Q");
        let a = state.add_terminal(Terminal::new(
            "U2.A".into(),
            DeviceId(1),
            TerminalKind::Input,
            Domain::Logic,
        ));
        let b = state.add_terminal(Terminal::new(
            "U3.A".into(),
            DeviceId(2),
            TerminalKind::Input,
            Domain::Logic,
        ));
        let inputs = state.connect(a, b).unwrap();
        let net = state.connect(q, a).unwrap();

        assert_eq!(state.net(net).terminals, vec![q, a, b]);
        assert_eq!(state.net(net).driver, Some(q));
        assert!(state.net(inputs).terminals.is_empty());
        assert_eq!(state.net_of(b), net);
    }

    #[test]
    fn test_two_drivers_rejected() {
        let mut state = NetState::new();
        let q1 = output(&mut state, "U1.Q");
        let q2 = output(&mut state, "U2.Q");
        let err = state.connect(q1, q2).unwrap_err();
        assert!(matches!(err, NetlistError::MultipleDrivers { .. }));
    }
}
