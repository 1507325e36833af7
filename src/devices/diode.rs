//! Diode model.
//!
//! Shockley equation `I = Is * (exp(Vd / (n * Vt)) - 1)`, re-linearised at
//! every Newton-Raphson iteration around the current operating point:
//!
//!   I ≈ Id + G * (V - Vd)
//!
//! Above the critical voltage the step in `Vd` is compressed logarithmically
//! so the exponential cannot overflow while the iteration converges.

use crate::circuit::{NetState, TerminalId};
use crate::error::{NetlistError, Result};

use super::builder::DeviceBuilder;
use super::params::{ModelKind, Params};
use super::DeviceModel;

/// Thermal voltage at room temperature (V).
pub const THERMAL_VOLTAGE: f64 = 0.0258;

/// Parallel conductance used until the solver parameters are known.
pub(crate) const DEFAULT_GMIN: f64 = 1e-9;

/// Operating point of a pn junction.
#[derive(Debug, Clone)]
pub struct Junction {
    /// Saturation current
    pub is: f64,
    /// Emission coefficient times thermal voltage
    pub vt: f64,
    /// Voltage above which steps are limited
    pub vcrit: f64,
    /// Reverse voltage below which the junction is treated as off
    pub vmin: f64,
    /// Minimum parallel conductance
    pub gmin: f64,
    /// Limited junction voltage
    pub vd: f64,
    /// Small signal conductance at `vd`
    pub g: f64,
    /// Current at `vd`
    pub id: f64,
}

impl Junction {
    pub fn new(is: f64, n: f64, gmin: f64) -> Self {
        let vt = n * THERMAL_VOLTAGE;
        let mut j = Self {
            is,
            vt,
            vcrit: vt * (vt / (is * std::f64::consts::SQRT_2)).ln(),
            vmin: -5.0 * vt,
            gmin,
            vd: 0.0,
            g: 0.0,
            id: 0.0,
        };
        j.evaluate();
        j
    }

    /// Move the operating point towards `v`.
    pub fn update(&mut self, v: f64) {
        if v > self.vcrit {
            let d = v - self.vd;
            let a = d.abs() / self.vt;
            self.vd += d.signum() * a.ln_1p() * self.vt;
        } else {
            self.vd = v;
        }
        self.evaluate();
    }

    pub(crate) fn evaluate(&mut self) {
        if self.vd < self.vmin {
            self.g = self.gmin;
            self.id = -self.is;
        } else {
            let e = (self.vd / self.vt).exp();
            self.g = self.is / self.vt * e + self.gmin;
            self.id = self.is * (e - 1.0) + self.gmin * self.vd;
        }
    }

    /// Equivalent current source of the linearised junction.
    pub fn i_eq(&self) -> f64 {
        self.id - self.g * self.vd
    }
}

/// A diode between anode `A` and cathode `K`.
#[derive(Debug, Clone)]
pub struct Diode {
    pub anode: TerminalId,
    pub cathode: TerminalId,
    pub junction: Junction,
}

impl Diode {
    /// Parameters come from a `.model` card named by `MODEL`, or from `IS`
    /// and `N` given on the instance.
    pub fn build(b: &mut DeviceBuilder<'_>, p: &Params, gmin: f64) -> Result<Self> {
        let name = b.name().to_string();
        let (is, n) = match p.text("MODEL") {
            Some(model) => {
                let m = b.model(model)?;
                if m.kind != ModelKind::Diode {
                    return Err(NetlistError::invalid_parameter(
                        &name,
                        "MODEL",
                        format!("'{}' is not a diode model", model),
                    ));
                }
                (m.get("IS", 1e-15), m.get("N", 1.0))
            }
            None => (
                p.positive(&name, "IS", 1e-15)?,
                p.positive(&name, "N", 1.0)?,
            ),
        };
        let (anode, cathode) = b.terminal_pair("A", "K")?;
        Ok(Self {
            anode,
            cathode,
            junction: Junction::new(is, n, gmin),
        })
    }

    pub fn reset(&mut self, state: &mut NetState, gmin: f64) {
        self.junction.gmin = gmin;
        self.junction.vd = 0.0;
        self.junction.evaluate();
        self.stamp(state);
    }

    /// Re-linearise around the voltage currently across the diode.
    pub fn update_terminals(&mut self, state: &mut NetState) {
        let v = state.analog(self.anode) - state.analog(self.cathode);
        self.junction.update(v);
        self.stamp(state);
    }

    fn stamp(&self, state: &mut NetState) {
        state.stamp_branch(self.anode, self.cathode, self.junction.g, self.junction.i_eq());
    }
}

pub(crate) fn diode(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Diode(Diode::build(b, p, DEFAULT_GMIN)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_junction_forward_bias() {
        let mut j = Junction::new(1e-14, 1.0, 1e-12);
        j.update(0.3);
        let i_small = j.id;
        j.update(0.6);
        assert!(j.id > i_small * 100.0);
    }

    #[test]
    fn test_junction_reverse_bias() {
        let mut j = Junction::new(1e-14, 1.0, 1e-12);
        j.update(-1.0);
        assert_relative_eq!(j.id, -1e-14);
        assert_relative_eq!(j.g, 1e-12);
    }

    #[test]
    fn test_step_limited_above_vcrit() {
        let mut j = Junction::new(1e-14, 1.0, 1e-12);
        j.update(5.0);
        assert!(j.vd < 1.0);
        assert!(j.id.is_finite());
    }

    #[test]
    fn test_linearisation_consistent() {
        let mut j = Junction::new(1e-14, 1.0, 1e-12);
        j.update(0.5);
        assert_relative_eq!(j.g * j.vd + j.i_eq(), j.id, max_relative = 1e-12);
    }
}
