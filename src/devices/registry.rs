//! Class name to constructor lookup.

use std::collections::HashMap;
use std::fmt;

use crate::error::{NetlistError, Result};

use super::builder::DeviceBuilder;
use super::params::Params;
use super::{bjt, counters, diode, flipflop, gates, linear, monostable, msi, observers, sources};
use super::DeviceModel;

/// Builds a device model, registering its pins on the builder.
pub type Constructor = fn(&mut DeviceBuilder<'_>, &Params) -> Result<DeviceModel>;

/// A device class that can be instantiated from a netlist.
#[derive(Clone)]
pub struct DeviceClass {
    pub name: &'static str,
    pub constructor: Constructor,
    /// Pins connected by positional netlist arguments, in order
    pub pins: &'static [&'static str],
    /// Parameters filled by positional numeric arguments, in order
    pub params: &'static [&'static str],
}

impl fmt::Debug for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceClass")
            .field("name", &self.name)
            .field("pins", &self.pins)
            .field("params", &self.params)
            .finish()
    }
}

/// Registry of device classes, owned by one circuit.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    classes: HashMap<&'static str, DeviceClass>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in device library.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        let gate2: &'static [&'static str] = &["A", "B", "Q"];

        r.register("TTL_7400_NAND", gates::nand_7400, gate2, &[]);
        r.register("TTL_7402_NOR", gates::nor_7402, gate2, &[]);
        r.register("TTL_7404_INVERT", gates::inverter_7404, &["A", "Q"], &[]);
        r.register("TTL_7408_AND", gates::and_7408, gate2, &[]);
        r.register("TTL_7410_NAND", gates::nand_7410, &["A", "B", "C", "Q"], &[]);
        r.register(
            "TTL_7420_NAND",
            gates::nand_7420,
            &["A", "B", "C", "D", "Q"],
            &[],
        );
        r.register("TTL_7432_OR", gates::or_7432, gate2, &[]);
        r.register("TTL_7486_XOR", gates::xor_7486, gate2, &[]);

        r.register(
            "TTL_7474",
            flipflop::ttl_7474,
            &["CLK", "D", "CLRQ", "PREQ", "Q", "QQ"],
            &[],
        );
        r.register(
            "TTL_7490",
            counters::ttl_7490,
            &["A", "B", "R1", "R2", "R91", "R92", "QA", "QB", "QC", "QD"],
            &[],
        );
        r.register(
            "TTL_9316",
            counters::ttl_9316,
            &[
                "CLK", "ENP", "ENT", "CLRQ", "LOADQ", "A", "B", "C", "D", "QA", "QB", "QC", "QD",
                "RC",
            ],
            &[],
        );
        r.register(
            "TTL_74121",
            monostable::ttl_74121,
            &["A1", "A2", "B", "Q", "QQ"],
            &["R", "C"],
        );
        r.register(
            "TTL_7448",
            msi::ttl_7448,
            &[
                "A", "B", "C", "D", "LTQ", "BIQ", "RBIQ", "a", "b", "c", "d", "e", "f", "g",
            ],
            &[],
        );
        r.register(
            "TTL_74153",
            msi::ttl_74153,
            &["C0", "C1", "C2", "C3", "A", "B", "G", "AY"],
            &[],
        );
        r.register(
            "TTL_7483",
            msi::ttl_7483,
            &[
                "A1", "A2", "A3", "A4", "B1", "B2", "B3", "B4", "C0", "S1", "S2", "S3", "S4",
                "C4",
            ],
            &[],
        );

        r.register("CLOCK", sources::clock, &["Q"], &["FREQ"]);
        r.register("LOGIC_INPUT", sources::logic_input, &["Q"], &["IN"]);
        r.register("ANALOG_INPUT", sources::analog_input, &["Q"], &["IN"]);
        r.register("GND", sources::ground, &["Q"], &[]);

        r.register("RES", linear::resistor, &["1", "2"], &["R"]);
        r.register("CAP", linear::capacitor, &["1", "2"], &["C"]);
        r.register("POT", linear::potentiometer, &["1", "2", "W"], &["R", "DIAL"]);
        r.register("VS", linear::voltage_source, &["P", "N"], &["V", "RI"]);
        r.register("CS", linear::current_source, &["P", "N"], &["I"]);
        r.register("SWITCH", linear::switch, &["1", "2", "CTL"], &["RON", "ROFF"]);
        r.register("DIODE", diode::diode, &["A", "K"], &["IS", "N"]);
        r.register("QBJT_EB", bjt::bjt, &["C", "B", "E"], &[]);

        r.register("PROBE", observers::probe, &["I"], &[]);
        r
    }

    /// Add or replace a device class.
    pub fn register(
        &mut self,
        name: &'static str,
        constructor: Constructor,
        pins: &'static [&'static str],
        params: &'static [&'static str],
    ) {
        self.classes.insert(
            name,
            DeviceClass {
                name,
                constructor,
                pins,
                params,
            },
        );
    }

    /// Look up a class by exact name.
    pub fn get(&self, name: &str) -> Result<&DeviceClass> {
        self.classes
            .get(name)
            .ok_or_else(|| NetlistError::UnknownDeviceClass {
                class: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Names of all registered classes, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        let r = DeviceRegistry::with_defaults();
        assert!(r.get("TTL_7400_NAND").is_ok());
        assert!(matches!(
            r.get("ttl_7400_nand"),
            Err(NetlistError::UnknownDeviceClass { .. })
        ));
        assert_eq!(r.get("RES").unwrap().params, &["R"]);
    }

    #[test]
    fn test_empty_registry() {
        let r = DeviceRegistry::new();
        assert!(r.names().is_empty());
        assert!(!r.contains("CLOCK"));
    }
}
