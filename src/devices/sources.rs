//! Signal sources: clock generator and external inputs.

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::linear::require_positive;
use super::params::Params;
use super::DeviceModel;

/// Free-running square wave. The output is fed back into the device and
/// every edge schedules the next one half a period later.
#[derive(Debug, Clone)]
pub struct Clock {
    pub q: TerminalId,
    fb: TerminalId,
    pub freq: f64,
    half_period: Time,
}

impl Clock {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let freq = p.positive(&name, "FREQ", 7_159_000.0)?;
        let q = b.logic_output("Q", false)?;
        let fb = b.logic_input("FB")?;
        b.link(q, fb)?;
        Ok(Self {
            q,
            fb,
            freq,
            half_period: Time::from_hz(2.0 * freq),
        })
    }

    pub fn reset(&mut self, ctx: &mut UpdateContext<'_>) {
        ctx.set_logic(self.q, true, self.half_period);
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>, trigger: Option<TerminalId>) {
        if trigger == Some(self.fb) {
            let next = !ctx.logic(self.fb);
            ctx.set_logic(self.q, next, self.half_period);
        }
    }

    pub fn set_freq(&mut self, name: &str, freq: f64) -> Result<()> {
        self.freq = require_positive(name, "FREQ", freq)?;
        self.half_period = Time::from_hz(2.0 * freq);
        Ok(())
    }
}

/// Logic level injected from outside the netlist.
#[derive(Debug, Clone)]
pub struct LogicInput {
    pub q: TerminalId,
    pub value: bool,
}

impl LogicInput {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let value = p.number(&name, "IN", 0.0)? != 0.0;
        Ok(Self {
            q: b.logic_output("Q", value)?,
            value,
        })
    }

    pub fn reset(&mut self, ctx: &mut UpdateContext<'_>) {
        ctx.force_logic(self.q, self.value);
    }

    /// Change the level; it reaches the net after the input delay.
    pub fn set(&mut self, ctx: &mut UpdateContext<'_>, value: bool) {
        self.value = value;
        let delay = ctx.input_delay();
        ctx.set_logic(self.q, value, delay);
    }
}

/// Voltage injected from outside the netlist. Also used for ground.
#[derive(Debug, Clone)]
pub struct AnalogInput {
    pub q: TerminalId,
    pub value: f64,
}

impl AnalogInput {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let value = p.number(&name, "IN", 0.0)?;
        Ok(Self {
            q: b.analog_output("Q", value)?,
            value,
        })
    }

    pub fn reset(&mut self, ctx: &mut UpdateContext<'_>) {
        ctx.force_analog(self.q, self.value);
    }

    /// Change the voltage; it reaches the net after the input delay.
    pub fn set(&mut self, ctx: &mut UpdateContext<'_>, value: f64) {
        self.value = value;
        let delay = ctx.input_delay();
        ctx.set_analog(self.q, value, delay);
    }
}

pub(crate) fn clock(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Clock(Clock::build(b, p)?))
}

pub(crate) fn logic_input(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::LogicInput(LogicInput::build(b, p)?))
}

pub(crate) fn analog_input(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::AnalogInput(AnalogInput::build(b, p)?))
}

pub(crate) fn ground(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::AnalogInput(AnalogInput::build(b, &Params::new())?))
}
