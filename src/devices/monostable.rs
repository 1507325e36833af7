//! 74121 non-retriggerable monostable multivibrator.
//!
//! The pulse is timed by an internal output fed back into the device, so
//! the end of the pulse is an ordinary queued event.

use crate::circuit::TerminalId;
use crate::error::Result;
use crate::simulator::UpdateContext;
use crate::time::Time;

use super::builder::DeviceBuilder;
use super::params::Params;
use super::DeviceModel;

const TRIGGER_DELAY: Time = Time::from_nsec(45);
const MIN_WIDTH: Time = Time::from_nsec(30);

/// 74121 monostable.
#[derive(Debug, Clone)]
pub struct Monostable {
    pub a1: TerminalId,
    pub a2: TerminalId,
    pub b: TerminalId,
    pub q: TerminalId,
    pub qq: TerminalId,
    timer: TerminalId,
    timer_fb: TerminalId,
    pub r: f64,
    pub c: f64,
    active: bool,
    last_trigger: bool,
}

impl Monostable {
    pub fn build(bld: &mut DeviceBuilder<'_>, p: &Params) -> Result<Self> {
        let name = bld.name().to_string();
        let r = p.positive(&name, "R", 2000.0)?;
        let c = p.number(&name, "C", 0.0)?;
        let a1 = bld.logic_input("A1")?;
        let a2 = bld.logic_input("A2")?;
        let b = bld.logic_input("B")?;
        let q = bld.logic_output("Q", false)?;
        let qq = bld.logic_output("QQ", true)?;
        let timer = bld.logic_output("_T", false)?;
        let timer_fb = bld.logic_input("_TFB")?;
        bld.link(timer, timer_fb)?;
        Ok(Self {
            a1,
            a2,
            b,
            q,
            qq,
            timer,
            timer_fb,
            r,
            c,
            active: false,
            last_trigger: false,
        })
    }

    /// Output pulse width for the current R and C.
    pub fn width(&self) -> Time {
        let w = Time::from_double(std::f64::consts::LN_2 * self.r * self.c);
        w.max(MIN_WIDTH)
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.last_trigger = false;
    }

    pub fn update(&mut self, ctx: &mut UpdateContext<'_>, trigger: Option<TerminalId>) {
        if trigger == Some(self.timer_fb) {
            if ctx.logic(self.timer_fb) {
                self.active = false;
                ctx.set_logic(self.q, false, Time::ZERO);
                ctx.set_logic(self.qq, true, Time::ZERO);
                ctx.set_logic(self.timer, false, Time::ZERO);
            }
            return;
        }

        let fire = (!ctx.logic(self.a1) || !ctx.logic(self.a2)) && ctx.logic(self.b);
        if fire && !self.last_trigger && !self.active {
            self.active = true;
            ctx.set_logic(self.q, true, TRIGGER_DELAY);
            ctx.set_logic(self.qq, false, TRIGGER_DELAY);
            ctx.set_logic(self.timer, true, TRIGGER_DELAY + self.width());
        }
        self.last_trigger = fire;
    }

    pub fn update_param(&mut self, name: &str, value: f64) -> bool {
        match name {
            "R" if value > 0.0 => self.r = value,
            "C" if value >= 0.0 => self.c = value,
            _ => return false,
        }
        true
    }
}

pub(crate) fn ttl_74121(b: &mut DeviceBuilder<'_>, p: &Params) -> Result<DeviceModel> {
    Ok(DeviceModel::Monostable(Monostable::build(b, p)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::NetState;
    use crate::circuit::DeviceId;
    use std::collections::HashMap;

    #[test]
    fn test_pulse_width() {
        let mut state = NetState::new();
        let mut pins = HashMap::new();
        let models = HashMap::new();
        let mut b = DeviceBuilder::new(&mut state, &mut pins, &models, DeviceId(0), "M1");
        let p = Params::new().with("R", 10e3).with("C", 100e-9);
        let mut m = Monostable::build(&mut b, &p).unwrap();

        let expected = std::f64::consts::LN_2 * 10e3 * 100e-9;
        assert!((m.width().as_double() - expected).abs() < 1e-9);

        assert!(m.update_param("C", 0.0));
        assert_eq!(m.width(), MIN_WIDTH);
        assert!(!m.update_param("X", 1.0));
    }
}
