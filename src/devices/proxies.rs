//! Domain boundary devices inserted while the circuit is finalised.

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::family::LogicFamily;

const ATOD_DELAY: Time = Time::from_nsec(1);

/// Converts a voltage into a logic level. The output only switches once the
/// input has crossed the far threshold, giving hysteresis between the two.
#[derive(Debug, Clone)]
pub struct AtoD {
    pub input: TerminalId,
    pub output: TerminalId,
    pub family: LogicFamily,
    state: bool,
}

impl AtoD {
    pub fn build(b: &mut DeviceBuilder<'_>, family: LogicFamily) -> Result<Self> {
        Ok(Self {
            input: b.analog_input("I")?,
            output: b.logic_output("Q", false)?,
            family,
            state: false,
        })
    }

    pub fn reset(&mut self, ctx: &mut UpdateContext<'_>) {
        self.state = ctx.analog(self.input) > self.family.high_threshold;
        ctx.force_logic(self.output, self.state);
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let v = ctx.analog(self.input);
        if self.state && v < self.family.low_threshold {
            self.state = false;
        } else if !self.state && v > self.family.high_threshold {
            self.state = true;
        } else {
            return;
        }
        ctx.set_logic(self.output, self.state, ATOD_DELAY);
    }
}

/// Drives an analog node from a logic level through the family's output
/// stage: a Thevenin source between the node and ground.
#[derive(Debug, Clone)]
pub struct DtoA {
    pub input: TerminalId,
    /// Branch end on the analog node
    pub p: TerminalId,
    /// Branch end on ground
    pub n: TerminalId,
    pub family: LogicFamily,
}

impl DtoA {
    pub fn build(b: &mut DeviceBuilder<'_>, family: LogicFamily) -> Result<Self> {
        let input = b.logic_input("I")?;
        let (p, n) = b.terminal_pair("Q", "GND")?;
        Ok(Self {
            input,
            p,
            n,
            family,
        })
    }

    fn restamp(&self, ctx: &mut UpdateContext<'_>) {
        let (v, r) = self.family.output(ctx.logic(self.input));
        let g = 1.0 / r;
        ctx.stamp_branch(self.p, self.n, g, -v * g);
    }

    pub fn reset(&self, ctx: &mut UpdateContext<'_>) {
        self.restamp(ctx);
    }

    pub fn update(&self, ctx: &mut UpdateContext<'_>) {
        self.restamp(ctx);
        ctx.solve_now(self.p);
    }
}
