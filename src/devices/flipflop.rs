//! 7474 positive-edge-triggered D flip-flop with preset and clear.

use crate::circuit::{InputState, TerminalId};
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// Clocked transition delays, indexed by new output value.
const DELAY: [Time; 2] = [Time::from_nsec(25), Time::from_nsec(40)];
/// Preset/clear delays, indexed by new output value.
const DELAY_CLEAR: [Time; 2] = [Time::from_nsec(40), Time::from_nsec(25)];

/// One D flip-flop section.
#[derive(Debug, Clone)]
pub struct DFlipFlop {
    pub clk: TerminalId,
    pub d: TerminalId,
    pub preq: TerminalId,
    pub clrq: TerminalId,
    pub q: TerminalId,
    pub qq: TerminalId,
}

impl DFlipFlop {
    pub fn build(b: &mut DeviceBuilder<'_>) -> Result<Self> {
        Ok(Self {
            clk: b.logic_input_with("CLK", InputState::LowToHigh)?,
            d: b.logic_input_with("D", InputState::Passive)?,
            clrq: b.logic_input("CLRQ")?,
            preq: b.logic_input("PREQ")?,
            q: b.logic_output("Q", false)?,
            qq: b.logic_output("QQ", true)?,
        })
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>, trigger: Option<TerminalId>) {
        let preq = ctx.logic(self.preq);
        let clrq = ctx.logic(self.clrq);

        if trigger == Some(self.clk) {
            if preq && clrq {
                let d = ctx.logic(self.d);
                self.set(ctx, d, !d, &DELAY);
            }
            return;
        }

        if preq && clrq {
            ctx.activate_lh(self.clk);
        } else {
            ctx.inactivate(self.clk);
            self.set(ctx, !preq, !clrq, &DELAY_CLEAR);
        }
    }

    fn set(&self, ctx: &mut UpdateContext<'_>, q: bool, qq: bool, delay: &[Time; 2]) {
        ctx.set_logic(self.q, q, delay[q as usize]);
        ctx.set_logic(self.qq, qq, delay[qq as usize]);
    }
}

pub(crate) fn ttl_7474(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Dff(DFlipFlop::build(b)?))
}
