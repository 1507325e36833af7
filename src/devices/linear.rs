//! Linear two-terminal elements: resistor, capacitor, potentiometer,
//! voltage and current sources, logic controlled switch.
//!
//! Every element is stamped as a branch whose current from the first to the
//! second terminal is `g * (V1 - V2) + i_eq`.

use crate::circuit::{NetState, TerminalId};
use crate::error::{NetlistError, Result};
use crate::simulator::UpdateContext;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// Smallest resistance a potentiometer section can reach.
const R_MIN: f64 = 0.1;

/// Ohmic resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub p: TerminalId,
    pub n: TerminalId,
    pub r: f64,
}

impl Resistor {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let r = p.positive(&name, "R", 1e3)?;
        let (tp, tn) = b.terminal_pair("1", "2")?;
        Ok(Self { p: tp, n: tn, r })
    }

    pub fn conductance(&self) -> f64 {
        1.0 / self.r
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        ctx.stamp_branch(self.p, self.n, self.conductance(), 0.0);
    }

    pub fn set_r(&mut self, ctx: &mut UpdateContext<'_>, r: f64) {
        self.r = r;
        self.reset(ctx);
        ctx.solve_now(self.p);
    }
}

/// Capacitor, integrated with backward Euler.
///
/// For a step `h` the companion model is a conductance `C/h` in parallel
/// with a current source carrying the charge of the previous step.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub p: TerminalId,
    pub n: TerminalId,
    pub c: f64,
}

impl Capacitor {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let c = p.positive(&name, "C", 1e-6)?;
        let (tp, tn) = b.terminal_pair("1", "2")?;
        Ok(Self { p: tp, n: tn, c })
    }

    /// Stamp the companion model for a step of `dt` seconds starting from
    /// the voltage currently across the capacitor.
    pub fn step_time(&self, dt: f64, state: &mut NetState) {
        let g = self.c / dt;
        let v_prev = state.analog(self.p) - state.analog(self.n);
        state.stamp_branch(self.p, self.n, g, -g * v_prev);
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        let h = ctx.params().min_timestep;
        let g = self.c / h;
        ctx.stamp_branch(self.p, self.n, g, 0.0);
    }
}

/// Potentiometer as two resistors meeting at the wiper.
#[derive(Debug, Clone)]
pub struct Potentiometer {
    /// Section from pin 1 to the wiper
    pub upper: (TerminalId, TerminalId),
    /// Section from the wiper to pin 2
    pub lower: (TerminalId, TerminalId),
    pub r: f64,
    /// Wiper position, 0 at pin 1
    pub dial: f64,
}

impl Potentiometer {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let r = p.positive(&name, "R", 10e3)?;
        let dial = p.number(&name, "DIAL", 0.5)?;
        let upper = b.internal_pair("1", "W1");
        let lower = b.internal_pair("W2", "2");
        b.expose("1", upper.0)?;
        b.expose("W", upper.1)?;
        b.expose("2", lower.1)?;
        b.join(upper.1, lower.0)?;
        Ok(Self {
            upper,
            lower,
            r,
            dial: dial.clamp(0.0, 1.0),
        })
    }

    /// Resistances of the upper and lower sections.
    pub fn sections(&self) -> (f64, f64) {
        let r1 = (self.dial * self.r).max(R_MIN);
        let r2 = ((1.0 - self.dial) * self.r).max(R_MIN);
        (r1, r2)
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        let (r1, r2) = self.sections();
        ctx.stamp_branch(self.upper.0, self.upper.1, 1.0 / r1, 0.0);
        ctx.stamp_branch(self.lower.0, self.lower.1, 1.0 / r2, 0.0);
    }

    pub fn set_dial(&mut self, ctx: &mut UpdateContext<'_>, dial: f64) {
        self.dial = dial.clamp(0.0, 1.0);
        self.reset(ctx);
        ctx.solve_now(self.upper.1);
    }

    pub fn set_r(&mut self, ctx: &mut UpdateContext<'_>, r: f64) {
        self.r = r;
        self.reset(ctx);
        ctx.solve_now(self.upper.1);
    }
}

/// Voltage source with internal resistance.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub p: TerminalId,
    pub n: TerminalId,
    pub v: f64,
    pub ri: f64,
}

impl VoltageSource {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let v = p.number(&name, "V", 0.0)?;
        let ri = p.positive(&name, "RI", 0.1)?;
        let (tp, tn) = b.terminal_pair("P", "N")?;
        Ok(Self { p: tp, n: tn, v, ri })
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        let g = 1.0 / self.ri;
        ctx.stamp_branch(self.p, self.n, g, -self.v * g);
    }

    pub fn set_v(&mut self, ctx: &mut UpdateContext<'_>, v: f64) {
        self.v = v;
        self.reset(ctx);
        ctx.solve_now(self.p);
    }
}

/// Ideal current source. Current flows from P through the source to N.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub p: TerminalId,
    pub n: TerminalId,
    pub i: f64,
}

impl CurrentSource {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let i = p.number(&name, "I", 0.0)?;
        let (tp, tn) = b.terminal_pair("P", "N")?;
        Ok(Self { p: tp, n: tn, i })
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        ctx.stamp_branch(self.p, self.n, 0.0, self.i);
    }

    pub fn set_i(&mut self, ctx: &mut UpdateContext<'_>, i: f64) {
        self.i = i;
        self.reset(ctx);
        ctx.solve_now(self.p);
    }
}

/// Analog switch controlled by a logic input; closed while `CTL` is high.
#[derive(Debug, Clone)]
pub struct Switch {
    pub p: TerminalId,
    pub n: TerminalId,
    pub ctl: TerminalId,
    pub ron: f64,
    pub roff: f64,
}

impl Switch {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let ron = p.positive(&name, "RON", 0.01)?;
        let roff = p.positive(&name, "ROFF", 1e9)?;
        let (tp, tn) = b.terminal_pair("1", "2")?;
        let ctl = b.logic_input("CTL")?;
        Ok(Self {
            p: tp,
            n: tn,
            ctl,
            ron,
            roff,
        })
    }

    fn restamp(&self, ctx: &mut UpdateContext<'_>) {
        let r = if ctx.logic(self.ctl) { self.ron } else { self.roff };
        ctx.stamp_branch(self.p, self.n, 1.0 / r, 0.0);
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        self.restamp(ctx);
    }

    pub fn update(&self, ctx: &mut UpdateContext<'_>) {
        self.restamp(ctx);
        ctx.solve_now(self.p);
    }
}

pub(crate) fn resistor(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Resistor(Resistor::build(b, p)?))
}

pub(crate) fn capacitor(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Capacitor(Capacitor::build(b, p)?))
}

pub(crate) fn potentiometer(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Potentiometer(Potentiometer::build(b, p)?))
}

pub(crate) fn voltage_source(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::VoltageSource(VoltageSource::build(b, p)?))
}

pub(crate) fn current_source(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::CurrentSource(CurrentSource::build(b, p)?))
}

pub(crate) fn switch(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Switch(Switch::build(b, p)?))
}

/// Reject a non-positive value for a resistance-like run time parameter.
pub(crate) fn require_positive(device: &str, param: &str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(NetlistError::invalid_parameter(
            device,
            param,
            format!("must be positive, got {}", value),
        ))
    }
}
