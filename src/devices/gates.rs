//! Combinational TTL gates.
//!
//! Every gate recomputes its output from all inputs on each trigger and
//! schedules it with the datasheet delay for the direction of the output
//! transition.

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

/// Boolean function of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Inverter,
}

impl GateKind {
    /// Evaluate the gate function.
    pub fn eval(self, inputs: &[bool]) -> bool {
        match self {
            GateKind::And => inputs.iter().all(|&v| v),
            GateKind::Nand => !inputs.iter().all(|&v| v),
            GateKind::Or => inputs.iter().any(|&v| v),
            GateKind::Nor => !inputs.iter().any(|&v| v),
            GateKind::Xor => inputs.iter().filter(|&&v| v).count() % 2 == 1,
            GateKind::Inverter => !inputs.first().copied().unwrap_or(false),
        }
    }
}

/// A single gate section.
#[derive(Debug, Clone)]
pub struct Gate {
    pub kind: GateKind,
    pub inputs: Vec<TerminalId>,
    pub output: TerminalId,
    /// Propagation delay indexed by the new output value: `[falling, rising]`
    pub delay: [Time; 2],
}

impl Gate {
    /// Register inputs named `A`, `B`, ... and output `Q`.
    pub fn build(
        b: &mut DeviceBuilder<'_>,
        kind: GateKind,
        inputs: usize,
        delay_ns: [i64; 2],
    ) -> Result<Self> {
        let names = ["A", "B", "C", "D"];
        let inputs = names[..inputs]
            .iter()
            .map(|pin| b.logic_input(pin))
            .collect::<Result<Vec<_>>>()?;
        let initial = kind.eval(&vec![false; inputs.len()]);
        let output = b.logic_output("Q", initial)?;
        Ok(Self {
            kind,
            inputs,
            output,
            delay: [Time::from_nsec(delay_ns[0]), Time::from_nsec(delay_ns[1])],
        })
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let values: Vec<bool> = self.inputs.iter().map(|&t| ctx.logic(t)).collect();
        let q = self.kind.eval(&values);
        ctx.set_logic(self.output, q, self.delay[q as usize]);
    }
}

macro_rules! gate_constructor {
    ($fn_name:ident, $kind:expr, $inputs:expr, $delay:expr) => {
        pub(crate) fn $fn_name(b: &mut DeviceBuilder<'_>, _p: &Params) -> Result<DeviceModel> {
            Ok(DeviceModel::Gate(Gate::build(b, $kind, $inputs, $delay)?))
        }
    };
}

gate_constructor!(nand_7400, GateKind::Nand, 2, [15, 22]);
gate_constructor!(nor_7402, GateKind::Nor, 2, [15, 22]);
gate_constructor!(inverter_7404, GateKind::Inverter, 1, [15, 22]);
gate_constructor!(and_7408, GateKind::And, 2, [19, 27]);
gate_constructor!(nand_7410, GateKind::Nand, 3, [15, 22]);
gate_constructor!(nand_7420, GateKind::Nand, 4, [15, 22]);
gate_constructor!(or_7432, GateKind::Or, 2, [22, 22]);
gate_constructor!(xor_7486, GateKind::Xor, 2, [17, 23]);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GateKind::Nand, &[true, true], false)]
    #[case(GateKind::Nand, &[true, false], true)]
    #[case(GateKind::Nor, &[false, false], true)]
    #[case(GateKind::Nor, &[false, true], false)]
    #[case(GateKind::And, &[true, true, true], true)]
    #[case(GateKind::Or, &[false, false], false)]
    #[case(GateKind::Xor, &[true, false], true)]
    #[case(GateKind::Xor, &[true, true], false)]
    #[case(GateKind::Inverter, &[true], false)]
    fn test_gate_eval(#[case] kind: GateKind, #[case] inputs: &[bool], #[case] expected: bool) {
        assert_eq!(kind.eval(inputs), expected);
    }
}
