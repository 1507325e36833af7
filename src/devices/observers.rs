//! Devices that report net values to the outside.

use std::fmt;

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// A recorded value change.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: Time,
    /// Name of the observing device or probed pin
    pub probe: String,
    /// Voltage, or 0/1 for a logic net
    pub value: f64,
}

/// Records every change of its input, plus the value at reset.
#[derive(Debug, Clone)]
pub struct Probe {
    pub input: TerminalId,
    pub label: String,
}

impl Probe {
    pub fn build(b: &mut DeviceBuilder<'_>, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            input: b.any_input("I")?,
            label: label.into(),
        })
    }

    pub fn update(&self, ctx: &mut UpdateContext<'_>) {
        let v = ctx.analog(self.input);
        ctx.observe(&self.label, v);
    }
}

/// Hands every change of its input to user code.
pub struct Callback {
    pub input: TerminalId,
    func: Box<dyn FnMut(Time, f64) + Send>,
}

impl Callback {
    pub fn build(
        b: &mut DeviceBuilder<'_>,
        func: Box<dyn FnMut(Time, f64) + Send>,
    ) -> Result<Self> {
        Ok(Self {
            input: b.any_input("I")?,
            func,
        })
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let v = ctx.analog(self.input);
        (self.func)(ctx.time(), v);
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

pub(crate) fn probe(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    let label = b.name().to_string();
    Ok(DeviceModel::Probe(Probe::build(b, label)?))
}
