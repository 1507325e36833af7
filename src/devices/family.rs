//! Logic families: thresholds and output stages used at domain boundaries.

/// Electrical description of a logic family.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicFamily {
    pub name: &'static str,
    /// Input reads low below this voltage
    pub low_threshold: f64,
    /// Input reads high above this voltage
    pub high_threshold: f64,
    /// Output voltage when low
    pub low_level: f64,
    /// Output voltage when high
    pub high_level: f64,
    /// Output impedance when low
    pub r_low: f64,
    /// Output impedance when high
    pub r_high: f64,
}

impl LogicFamily {
    /// Standard TTL.
    pub fn ttl() -> Self {
        Self {
            name: "TTL",
            low_threshold: 0.8,
            high_threshold: 2.0,
            low_level: 0.1,
            high_level: 4.0,
            r_low: 1.0,
            r_high: 130.0,
        }
    }

    /// 5 V CMOS (CD4000 series).
    pub fn cmos_5v() -> Self {
        Self {
            name: "CMOS",
            low_threshold: 1.5,
            high_threshold: 3.5,
            low_level: 0.05,
            high_level: 4.95,
            r_low: 10.0,
            r_high: 10.0,
        }
    }

    /// Output voltage and impedance for a logic level.
    pub fn output(&self, high: bool) -> (f64, f64) {
        if high {
            (self.high_level, self.r_high)
        } else {
            (self.low_level, self.r_low)
        }
    }
}

impl Default for LogicFamily {
    fn default() -> Self {
        Self::ttl()
    }
}
