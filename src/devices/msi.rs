//! MSI combinational parts: 7448 BCD to 7-segment decoder, 74153 4-to-1
//! multiplexer section, 7483 4-bit full adder.

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// Segments a..g for every 4-bit input value. 15 is blank.
const SEGMENTS_7448: [[bool; 7]; 16] = {
    const O: bool = false;
    const I: bool = true;
    [
        [I, I, I, I, I, I, O], // 0
        [O, I, I, O, O, O, O], // 1
        [I, I, O, I, I, O, I], // 2
        [I, I, I, I, O, O, I], // 3
        [O, I, I, O, O, I, I], // 4
        [I, O, I, I, O, I, I], // 5
        [O, O, I, I, I, I, I], // 6
        [I, I, I, O, O, O, O], // 7
        [I, I, I, I, I, I, I], // 8
        [I, I, I, O, O, I, I], // 9
        [O, O, O, I, I, O, I], // 10
        [O, O, I, I, O, O, I], // 11
        [O, I, O, O, O, I, I], // 12
        [I, O, O, I, O, I, I], // 13
        [O, O, O, I, I, I, I], // 14
        [O, O, O, O, O, O, O], // 15
    ]
};

const DELAY_7448: Time = Time::from_nsec(100);
const BLANK: usize = 15;
const LAMP_TEST: usize = 8;

/// 7448 BCD to 7-segment decoder with lamp test and ripple blanking.
#[derive(Debug, Clone)]
pub struct SevenSegment {
    pub inputs: [TerminalId; 4],
    pub ltq: TerminalId,
    pub biq: TerminalId,
    pub rbiq: TerminalId,
    pub segments: [TerminalId; 7],
}

impl SevenSegment {
    pub fn build(b: &mut DeviceBuilder<'_>) -> Result<Self> {
        let inputs = [
            b.logic_input("A")?,
            b.logic_input("B")?,
            b.logic_input("C")?,
            b.logic_input("D")?,
        ];
        let ltq = b.logic_input("LTQ")?;
        let biq = b.logic_input("BIQ")?;
        let rbiq = b.logic_input("RBIQ")?;
        let mut segments = Vec::with_capacity(7);
        for (pin, &on) in ["a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .zip(SEGMENTS_7448[0].iter())
        {
            segments.push(b.logic_output(pin, on)?);
        }
        Ok(Self {
            inputs,
            ltq,
            biq,
            rbiq,
            segments: [
                segments[0],
                segments[1],
                segments[2],
                segments[3],
                segments[4],
                segments[5],
                segments[6],
            ],
        })
    }

    /// Index into the segment table for the current inputs.
    pub fn pattern(&self, ctx: &UpdateContext<'_>) -> usize {
        let value: usize = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, &t)| (ctx.logic(t) as usize) << i)
            .sum();
        if !ctx.logic(self.biq) {
            BLANK
        } else if !ctx.logic(self.ltq) {
            LAMP_TEST
        } else if !ctx.logic(self.rbiq) && value == 0 {
            BLANK
        } else {
            value
        }
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let row = SEGMENTS_7448[self.pattern(ctx)];
        for (&seg, &on) in self.segments.iter().zip(row.iter()) {
            ctx.set_logic(seg, on, DELAY_7448);
        }
    }
}

/// Output delay of the 74153, indexed by new output value.
const DELAY_74153: [Time; 2] = [Time::from_nsec(23), Time::from_nsec(18)];

/// One 74153 section: four data inputs, shared select lines, active low
/// strobe.
#[derive(Debug, Clone)]
pub struct Mux {
    pub data: [TerminalId; 4],
    pub a: TerminalId,
    pub b: TerminalId,
    pub g: TerminalId,
    pub y: TerminalId,
}

impl Mux {
    pub fn build(bld: &mut DeviceBuilder<'_>) -> Result<Self> {
        Ok(Self {
            data: [
                bld.logic_input("C0")?,
                bld.logic_input("C1")?,
                bld.logic_input("C2")?,
                bld.logic_input("C3")?,
            ],
            a: bld.logic_input("A")?,
            b: bld.logic_input("B")?,
            g: bld.logic_input("G")?,
            y: bld.logic_output("AY", false)?,
        })
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let y = if ctx.logic(self.g) {
            false
        } else {
            let chan = (ctx.logic(self.a) as usize) | ((ctx.logic(self.b) as usize) << 1);
            ctx.logic(self.data[chan])
        };
        ctx.set_logic(self.y, y, DELAY_74153[y as usize]);
    }
}

const DELAY_7483: Time = Time::from_nsec(23);

/// 7483 4-bit binary full adder with carry in and carry out.
#[derive(Debug, Clone)]
pub struct Adder {
    pub a: [TerminalId; 4],
    pub b: [TerminalId; 4],
    pub c0: TerminalId,
    pub s: [TerminalId; 4],
    pub c4: TerminalId,
}

impl Adder {
    pub fn build(bld: &mut DeviceBuilder<'_>) -> Result<Self> {
        Ok(Self {
            a: [
                bld.logic_input("A1")?,
                bld.logic_input("A2")?,
                bld.logic_input("A3")?,
                bld.logic_input("A4")?,
            ],
            b: [
                bld.logic_input("B1")?,
                bld.logic_input("B2")?,
                bld.logic_input("B3")?,
                bld.logic_input("B4")?,
            ],
            c0: bld.logic_input("C0")?,
            s: [
                bld.logic_output("S1", false)?,
                bld.logic_output("S2", false)?,
                bld.logic_output("S3", false)?,
                bld.logic_output("S4", false)?,
            ],
            c4: bld.logic_output("C4", false)?,
        })
    }

    fn word(ctx: &UpdateContext<'_>, bits: &[TerminalId; 4]) -> u8 {
        bits.iter()
            .enumerate()
            .map(|(i, &t)| (ctx.logic(t) as u8) << i)
            .sum()
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let sum = Self::word(ctx, &self.a) + Self::word(ctx, &self.b) + ctx.logic(self.c0) as u8;
        for (i, &s) in self.s.iter().enumerate() {
            ctx.set_logic(s, (sum >> i) & 1 == 1, DELAY_7483);
        }
        ctx.set_logic(self.c4, sum >> 4 == 1, DELAY_7483);
    }
}

pub(crate) fn ttl_7448(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::SevenSegment(SevenSegment::build(b)?))
}

pub(crate) fn ttl_74153(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Mux(Mux::build(b)?))
}

pub(crate) fn ttl_7483(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Adder(Adder::build(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "abcdef")]
    #[case(1, "bc")]
    #[case(2, "abdeg")]
    #[case(7, "abc")]
    #[case(8, "abcdefg")]
    #[case(9, "abcfg")]
    #[case(15, "")]
    fn test_segment_table(#[case] value: usize, #[case] lit: &str) {
        let names = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];
        let on: String = names
            .iter()
            .zip(SEGMENTS_7448[value].iter())
            .filter(|(_, &on)| on)
            .map(|(&n, _)| n)
            .collect();
        assert_eq!(on, lit);
    }
}
