//! Counters: 7490 decade counter and 9316 synchronous 4-bit binary counter.

use crate::circuit::{InputState, TerminalId};
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// Output delays of the 7490 ripple chain, QA..QD.
const DELAY_7490: [Time; 4] = [
    Time::from_nsec(18),
    Time::from_nsec(36 - 18),
    Time::from_nsec(54 - 18),
    Time::from_nsec(72 - 18),
];

/// 7490 decade counter: a divide-by-2 stage clocked by A and a divide-by-5
/// stage clocked by B, both on falling edges.
#[derive(Debug, Clone)]
pub struct DecadeCounter {
    pub a: TerminalId,
    pub b: TerminalId,
    pub r1: TerminalId,
    pub r2: TerminalId,
    pub r91: TerminalId,
    pub r92: TerminalId,
    pub q: [TerminalId; 4],
    pub count: u8,
    last_a: bool,
    last_b: bool,
}

impl DecadeCounter {
    pub fn build(bld: &mut DeviceBuilder<'_>) -> Result<Self> {
        Ok(Self {
            a: bld.logic_input("A")?,
            b: bld.logic_input("B")?,
            r1: bld.logic_input("R1")?,
            r2: bld.logic_input("R2")?,
            r91: bld.logic_input("R91")?,
            r92: bld.logic_input("R92")?,
            q: [
                bld.logic_output("QA", false)?,
                bld.logic_output("QB", false)?,
                bld.logic_output("QC", false)?,
                bld.logic_output("QD", false)?,
            ],
            count: 0,
            last_a: false,
            last_b: false,
        })
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last_a = false;
        self.last_b = false;
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let new_a = ctx.logic(self.a);
        let new_b = ctx.logic(self.b);

        if ctx.logic(self.r91) && ctx.logic(self.r92) {
            self.count = 9;
            self.update_outputs(ctx);
        } else if ctx.logic(self.r1) && ctx.logic(self.r2) {
            self.count = 0;
            self.update_outputs(ctx);
        } else {
            if self.last_a && !new_a {
                self.count ^= 1;
                self.update_outputs(ctx);
            }
            if self.last_b && !new_b {
                self.count += 2;
                if self.count >= 10 {
                    // QA belongs to the other stage and keeps its value
                    self.count &= 1;
                }
                self.update_outputs(ctx);
            }
        }
        self.last_a = new_a;
        self.last_b = new_b;
    }

    fn update_outputs(&self, ctx: &mut UpdateContext<'_>) {
        for (i, &q) in self.q.iter().enumerate() {
            ctx.set_logic(q, (self.count >> i) & 1 == 1, DELAY_7490[i]);
        }
    }
}

const MAXCNT: u8 = 15;
const DELAY_CLEAR: Time = Time::from_nsec(36);
const DELAY_COUNT: Time = Time::from_nsec(20);
const DELAY_LOAD: Time = Time::from_nsec(22);
const DELAY_RC: Time = Time::from_nsec(27);

/// 9316 synchronous 4-bit binary counter with asynchronous clear and
/// synchronous load.
#[derive(Debug, Clone)]
pub struct BinaryCounter {
    pub clk: TerminalId,
    pub enp: TerminalId,
    pub ent: TerminalId,
    pub clrq: TerminalId,
    pub loadq: TerminalId,
    pub data: [TerminalId; 4],
    pub q: [TerminalId; 4],
    pub rc: TerminalId,
    pub count: u8,
}

impl BinaryCounter {
    pub fn build(b: &mut DeviceBuilder<'_>) -> Result<Self> {
        Ok(Self {
            clk: b.logic_input_with("CLK", InputState::Passive)?,
            enp: b.logic_input("ENP")?,
            ent: b.logic_input("ENT")?,
            clrq: b.logic_input("CLRQ")?,
            loadq: b.logic_input("LOADQ")?,
            data: [
                b.logic_input_with("A", InputState::Passive)?,
                b.logic_input_with("B", InputState::Passive)?,
                b.logic_input_with("C", InputState::Passive)?,
                b.logic_input_with("D", InputState::Passive)?,
            ],
            q: [
                b.logic_output("QA", false)?,
                b.logic_output("QB", false)?,
                b.logic_output("QC", false)?,
                b.logic_output("QD", false)?,
            ],
            rc: b.logic_output("RC", false)?,
            count: 0,
        })
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>, trigger: Option<TerminalId>) {
        let ent = ctx.logic(self.ent);

        if trigger == Some(self.clk) {
            if ctx.logic(self.loadq) {
                self.count = if self.count < MAXCNT { self.count + 1 } else { 0 };
                self.update_outputs(ctx, DELAY_COUNT);
            } else {
                self.count = self.data_value(ctx);
                self.update_outputs(ctx, DELAY_LOAD);
            }
        } else {
            let clrq = ctx.logic(self.clrq);
            let loadq = ctx.logic(self.loadq);
            if (!loadq || (ent && ctx.logic(self.enp))) && clrq {
                ctx.activate_lh(self.clk);
            } else {
                ctx.inactivate(self.clk);
                if !clrq && self.count > 0 {
                    self.count = 0;
                    self.update_outputs(ctx, DELAY_CLEAR);
                }
            }
        }
        ctx.set_logic(self.rc, ent && self.count == MAXCNT, DELAY_RC);
    }

    fn data_value(&self, ctx: &UpdateContext<'_>) -> u8 {
        self.data
            .iter()
            .enumerate()
            .map(|(i, &t)| (ctx.logic(t) as u8) << i)
            .sum()
    }

    fn update_outputs(&self, ctx: &mut UpdateContext<'_>, delay: Time) {
        for (i, &q) in self.q.iter().enumerate() {
            ctx.set_logic(q, (self.count >> i) & 1 == 1, delay);
        }
    }
}

pub(crate) fn ttl_7490(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::DecadeCounter(DecadeCounter::build(b)?))
}

pub(crate) fn ttl_9316(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::BinaryCounter(BinaryCounter::build(b)?))
}
