//! Bipolar transistor, Ebers-Moll injection model.
//!
//! The transistor is two junctions (base-emitter and base-collector) coupled
//! by current-controlled current sources with gains `αF = BF / (1 + BF)` and
//! `αR = BR / (1 + BR)`. It is stamped through three internal branches
//! B-E, B-C and C-E whose ends are joined to form the C, B and E pins.

use crate::circuit::{NetState, TerminalId};
use crate::error::{NetlistError, Result};

use super::builder::DeviceBuilder;
use super::diode::{Junction, DEFAULT_GMIN};
use super::params::{ModelKind, Params};
use super::DeviceModel;

/// Transistor polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BjtType {
    Npn,
    Pnp,
}

impl BjtType {
    fn sign(self) -> f64 {
        match self {
            BjtType::Npn => 1.0,
            BjtType::Pnp => -1.0,
        }
    }
}

/// Model card values.
#[derive(Debug, Clone)]
pub struct BjtParams {
    /// Transport saturation current
    pub is: f64,
    /// Forward current gain
    pub bf: f64,
    /// Reverse current gain
    pub br: f64,
    /// Forward emission coefficient
    pub nf: f64,
    /// Reverse emission coefficient
    pub nr: f64,
}

impl Default for BjtParams {
    fn default() -> Self {
        Self {
            is: 1e-15,
            bf: 100.0,
            br: 1.0,
            nf: 1.0,
            nr: 1.0,
        }
    }
}

impl BjtParams {
    pub fn alpha_f(&self) -> f64 {
        self.bf / (1.0 + self.bf)
    }

    pub fn alpha_r(&self) -> f64 {
        self.br / (1.0 + self.br)
    }
}

/// Terminals of one internal branch.
#[derive(Debug, Clone, Copy)]
struct Branch {
    a: TerminalId,
    b: TerminalId,
}

/// A bipolar transistor with pins `C`, `B`, `E`.
#[derive(Debug, Clone)]
pub struct Bjt {
    pub bjt_type: BjtType,
    pub params: BjtParams,
    /// B-E branch, `a` on the base
    be: Branch,
    /// B-C branch, `a` on the base
    bc: Branch,
    /// C-E branch, `a` on the collector
    ce: Branch,
    pub d_be: Junction,
    pub d_bc: Junction,
}

impl Bjt {
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = b.name().to_string();
        let model = p.text("MODEL").unwrap_or("NPN");
        let (bjt_type, params) = match model.to_ascii_uppercase().as_str() {
            "NPN" => (BjtType::Npn, BjtParams::default()),
            "PNP" => (BjtType::Pnp, BjtParams::default()),
            _ => {
                let m = b.model(model)?;
                let bjt_type = match m.kind {
                    ModelKind::Npn => BjtType::Npn,
                    ModelKind::Pnp => BjtType::Pnp,
                    ModelKind::Diode => {
                        return Err(NetlistError::invalid_parameter(
                            &name,
                            "MODEL",
                            format!("'{}' is not a transistor model", model),
                        ));
                    }
                };
                let d = BjtParams::default();
                let params = BjtParams {
                    is: m.get("IS", d.is),
                    bf: m.get("BF", d.bf),
                    br: m.get("BR", d.br),
                    nf: m.get("NF", d.nf),
                    nr: m.get("NR", d.nr),
                };
                (bjt_type, params)
            }
        };
        if params.is <= 0.0 || params.bf <= 0.0 || params.br <= 0.0 {
            return Err(NetlistError::invalid_parameter(
                &name,
                "MODEL",
                "IS, BF and BR must be positive",
            ));
        }

        let (b1, e1) = b.internal_pair("B", "E");
        let (b2, c1) = b.internal_pair("_B2", "C");
        let (c2, e2) = b.internal_pair("_C2", "_E2");
        b.expose("B", b1)?;
        b.expose("C", c1)?;
        b.expose("E", e1)?;
        b.join(b1, b2)?;
        b.join(c1, c2)?;
        b.join(e1, e2)?;

        let d_be = Junction::new(params.is / params.alpha_f(), params.nf, DEFAULT_GMIN);
        let d_bc = Junction::new(params.is / params.alpha_r(), params.nr, DEFAULT_GMIN);
        Ok(Self {
            bjt_type,
            params,
            be: Branch { a: b1, b: e1 },
            bc: Branch { a: b2, b: c1 },
            ce: Branch { a: c2, b: e2 },
            d_be,
            d_bc,
        })
    }

    pub fn reset(&mut self, state: &mut NetState, gmin: f64) {
        for d in [&mut self.d_be, &mut self.d_bc] {
            d.gmin = gmin;
            d.vd = 0.0;
            d.evaluate();
        }
        self.stamp(state);
    }

    /// Re-linearise both junctions around the present node voltages.
    pub fn update_terminals(&mut self, state: &mut NetState) {
        let s = self.bjt_type.sign();
        let vb = state.analog(self.be.a);
        let ve = state.analog(self.be.b);
        let vc = state.analog(self.bc.b);
        self.d_be.update(s * (vb - ve));
        self.d_bc.update(s * (vb - vc));
        self.stamp(state);
    }

    fn stamp(&self, state: &mut NetState) {
        let s = self.bjt_type.sign();
        let af = self.params.alpha_f();
        let ar = self.params.alpha_r();
        let gee = self.d_be.g;
        let gcc = self.d_bc.g;
        let ie = s * self.d_be.i_eq();
        let ic = s * self.d_bc.i_eq();

        let base = -(1.0 - af) * ie - (1.0 - ar) * ic;
        state
            .terminal_mut(self.be.a)
            .set_stamp(gee * (1.0 - af), gee * (1.0 - af), base);
        state
            .terminal_mut(self.be.b)
            .set_stamp(gee, gee - ar * gcc, ie - ar * ic);
        state
            .terminal_mut(self.bc.a)
            .set_stamp(gcc * (1.0 - ar), gcc * (1.0 - ar), 0.0);
        state
            .terminal_mut(self.bc.b)
            .set_stamp(gcc, gcc - af * gee, ic - af * ie);
        state.terminal_mut(self.ce.a).set_stamp(0.0, af * gee, 0.0);
        state.terminal_mut(self.ce.b).set_stamp(0.0, ar * gcc, 0.0);
    }
}

pub(crate) fn bjt(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Bjt(Bjt::build(b, p)?))
}
