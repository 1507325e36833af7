//! Device models.
//!
//! This module provides every device the simulator can instantiate:
//! - Gates: 7400, 7402, 7404, 7408, 7410, 7420, 7432, 7486
//! - Sequential: 7474 flip-flop, 7490 and 9316 counters, 74121 monostable
//! - MSI: 7448 decoder, 74153 multiplexer, 7483 adder
//! - Sources: clock, logic and analog inputs, ground
//! - Analog: resistor, capacitor, potentiometer, sources, switch, diode, BJT
//! - Proxies and observers
//!
//! Devices are a closed set of variants dispatched through [`DeviceModel`].
//! Analog devices stamp their terminals; the solver reads the stamps.

pub mod bjt;
pub mod builder;
pub mod counters;
pub mod diode;
pub mod family;
pub mod flipflop;
pub mod gates;
pub mod linear;
pub mod monostable;
pub mod msi;
pub mod observers;
pub mod params;
pub mod proxies;
pub mod registry;
pub mod sources;

pub use bjt::{Bjt, BjtParams, BjtType};
pub use builder::DeviceBuilder;
pub use counters::{BinaryCounter, DecadeCounter};
pub use diode::{Diode, Junction};
pub use family::LogicFamily;
pub use flipflop::DFlipFlop;
pub use gates::{Gate, GateKind};
pub use linear::{Capacitor, CurrentSource, Potentiometer, Resistor, Switch, VoltageSource};
pub use monostable::Monostable;
pub use msi::{Adder, Mux, SevenSegment};
pub use observers::{Callback, Observation, Probe};
pub use params::{ModelDef, ModelKind, ParamValue, Params};
pub use proxies::{AtoD, DtoA};
pub use registry::{Constructor, DeviceClass, DeviceRegistry};
pub use sources::{AnalogInput, Clock, LogicInput};

use crate::circuit::{NetState, TerminalId};
use crate::error::{NetlistError, Result};
use crate::simulator::UpdateContext;

use linear::require_positive;

/// Behaviour of a device.
#[derive(Debug)]
pub enum DeviceModel {
    Gate(Gate),
    Dff(DFlipFlop),
    DecadeCounter(DecadeCounter),
    BinaryCounter(BinaryCounter),
    SevenSegment(SevenSegment),
    Mux(Mux),
    Adder(Adder),
    Monostable(Monostable),
    Clock(Clock),
    LogicInput(LogicInput),
    AnalogInput(AnalogInput),
    Resistor(Resistor),
    Capacitor(Capacitor),
    Potentiometer(Potentiometer),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Switch(Switch),
    Diode(Diode),
    Bjt(Bjt),
    AtoD(AtoD),
    DtoA(DtoA),
    Probe(Probe),
    Callback(Callback),
    /// Placeholder owning the solver's scheduling terminals; the solver
    /// itself lives outside the device list.
    Solver,
}

/// A device instance.
#[derive(Debug)]
pub struct Device {
    /// Instance name
    pub name: String,
    /// Registry class name
    pub class: String,
    pub model: DeviceModel,
}

impl Device {
    pub fn new(name: impl Into<String>, class: impl Into<String>, model: DeviceModel) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            model,
        }
    }

    /// Check if the device stamps solver terminals.
    pub fn has_terminals(&self) -> bool {
        matches!(
            self.model,
            DeviceModel::Resistor(_)
                | DeviceModel::Capacitor(_)
                | DeviceModel::Potentiometer(_)
                | DeviceModel::VoltageSource(_)
                | DeviceModel::CurrentSource(_)
                | DeviceModel::Switch(_)
                | DeviceModel::Diode(_)
                | DeviceModel::Bjt(_)
                | DeviceModel::DtoA(_)
        )
    }

    /// Check if the stamp depends on the operating point.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.model, DeviceModel::Diode(_) | DeviceModel::Bjt(_))
    }

    /// Check if the stamp depends on the time step.
    pub fn is_timestep(&self) -> bool {
        matches!(self.model, DeviceModel::Capacitor(_))
    }

    /// Bring the device to its power-on state.
    pub fn reset(&mut self, ctx: &mut UpdateContext<'_>) {
        let gmin = ctx.params().gmin;
        match &mut self.model {
            DeviceModel::DecadeCounter(d) => d.reset(),
            DeviceModel::BinaryCounter(d) => d.reset(),
            DeviceModel::Monostable(d) => d.reset(),
            DeviceModel::Clock(d) => d.reset(ctx),
            DeviceModel::LogicInput(d) => d.reset(ctx),
            DeviceModel::AnalogInput(d) => d.reset(ctx),
            DeviceModel::Resistor(d) => d.reset(ctx),
            DeviceModel::Capacitor(d) => d.reset(ctx),
            DeviceModel::Potentiometer(d) => d.reset(ctx),
            DeviceModel::VoltageSource(d) => d.reset(ctx),
            DeviceModel::CurrentSource(d) => d.reset(ctx),
            DeviceModel::Switch(d) => d.reset(ctx),
            DeviceModel::Diode(d) => d.reset(ctx.state, gmin),
            DeviceModel::Bjt(d) => d.reset(ctx.state, gmin),
            DeviceModel::AtoD(d) => d.reset(ctx),
            DeviceModel::DtoA(d) => d.reset(ctx),
            DeviceModel::Gate(_)
            | DeviceModel::Dff(_)
            | DeviceModel::SevenSegment(_)
            | DeviceModel::Mux(_)
            | DeviceModel::Adder(_)
            | DeviceModel::Probe(_)
            | DeviceModel::Callback(_)
            | DeviceModel::Solver => {}
        }
    }

    /// React to input activity. `trigger` is the input that fired, or `None`
    /// for the initial update after reset.
    pub fn update(&mut self, ctx: &mut UpdateContext<'_>, trigger: Option<TerminalId>) {
        match &mut self.model {
            DeviceModel::Gate(d) => d.update(ctx),
            DeviceModel::Dff(d) => d.update(ctx, trigger),
            DeviceModel::DecadeCounter(d) => d.update(ctx),
            DeviceModel::BinaryCounter(d) => d.update(ctx, trigger),
            DeviceModel::SevenSegment(d) => d.update(ctx),
            DeviceModel::Mux(d) => d.update(ctx),
            DeviceModel::Adder(d) => d.update(ctx),
            DeviceModel::Monostable(d) => d.update(ctx, trigger),
            DeviceModel::Clock(d) => d.update(ctx, trigger),
            DeviceModel::Switch(d) => d.update(ctx),
            DeviceModel::AtoD(d) => d.update(ctx),
            DeviceModel::DtoA(d) => d.update(ctx),
            DeviceModel::Probe(d) => d.update(ctx),
            DeviceModel::Callback(d) => d.update(ctx),
            DeviceModel::LogicInput(_)
            | DeviceModel::AnalogInput(_)
            | DeviceModel::Resistor(_)
            | DeviceModel::Capacitor(_)
            | DeviceModel::Potentiometer(_)
            | DeviceModel::VoltageSource(_)
            | DeviceModel::CurrentSource(_)
            | DeviceModel::Diode(_)
            | DeviceModel::Bjt(_)
            | DeviceModel::Solver => {}
        }
    }

    /// Change a parameter while the simulation runs.
    pub fn update_param(
        &mut self,
        ctx: &mut UpdateContext<'_>,
        param: &str,
        value: f64,
    ) -> Result<()> {
        let param = param.to_ascii_uppercase();
        let name = self.name.as_str();
        let fixed = || {
            NetlistError::invalid_parameter(
                name,
                &param,
                format!("not adjustable on {}", self.class),
            )
        };
        match (&mut self.model, param.as_str()) {
            (DeviceModel::LogicInput(d), "IN") => d.set(ctx, value != 0.0),
            (DeviceModel::AnalogInput(d), "IN") => d.set(ctx, value),
            (DeviceModel::Clock(d), "FREQ") => d.set_freq(name, value)?,
            (DeviceModel::Resistor(d), "R") => d.set_r(ctx, require_positive(name, "R", value)?),
            (DeviceModel::Capacitor(d), "C") => d.c = require_positive(name, "C", value)?,
            (DeviceModel::Potentiometer(d), "DIAL") => d.set_dial(ctx, value),
            (DeviceModel::Potentiometer(d), "R") => {
                d.set_r(ctx, require_positive(name, "R", value)?)
            }
            (DeviceModel::VoltageSource(d), "V") => d.set_v(ctx, value),
            (DeviceModel::CurrentSource(d), "I") => d.set_i(ctx, value),
            (DeviceModel::Switch(d), "RON") => {
                d.ron = require_positive(name, "RON", value)?;
                d.update(ctx);
            }
            (DeviceModel::Switch(d), "ROFF") => {
                d.roff = require_positive(name, "ROFF", value)?;
                d.update(ctx);
            }
            (DeviceModel::Monostable(d), p) => {
                if !d.update_param(p, value) {
                    return Err(fixed());
                }
            }
            _ => return Err(fixed()),
        }
        Ok(())
    }

    /// Advance time-stepped devices by `dt` seconds.
    pub fn step_time(&mut self, dt: f64, state: &mut NetState) {
        if let DeviceModel::Capacitor(d) = &self.model {
            d.step_time(dt, state);
        }
    }

    /// Re-linearise the stamp of a dynamic device.
    pub fn update_terminals(&mut self, state: &mut NetState) {
        match &mut self.model {
            DeviceModel::Diode(d) => d.update_terminals(state),
            DeviceModel::Bjt(d) => d.update_terminals(state),
            _ => {}
        }
    }
}
