//! Device parameters and semiconductor model cards.

use std::collections::HashMap;
use std::fmt;

use crate::error::{NetlistError, Result};

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// Named parameters of one device instance. Names are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_ascii_uppercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge another set of parameters over this one.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// Read a numeric parameter, falling back to `default`.
    pub fn number(&self, device: &str, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(ParamValue::Number(v)) => Ok(*v),
            Some(ParamValue::Text(s)) => Err(NetlistError::invalid_parameter(
                device,
                name,
                format!("expected a number, got '{}'", s),
            )),
        }
    }

    /// Read a strictly positive numeric parameter.
    pub fn positive(&self, device: &str, name: &str, default: f64) -> Result<f64> {
        let v = self.number(device, name, default)?;
        if v <= 0.0 || !v.is_finite() {
            return Err(NetlistError::invalid_parameter(
                device,
                name,
                format!("must be positive, got {}", v),
            ));
        }
        Ok(v)
    }

    /// Read a text parameter.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

/// Semiconductor model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Diode,
    Npn,
    Pnp,
}

impl ModelKind {
    /// Parse a model kind from its card keyword.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "D" | "DIODE" => Some(Self::Diode),
            "NPN" => Some(Self::Npn),
            "PNP" => Some(Self::Pnp),
            _ => None,
        }
    }
}

/// A named model card, e.g. `.model 1N914 D (IS=2.52n N=1.752)`.
#[derive(Debug, Clone)]
pub struct ModelDef {
    pub name: String,
    pub kind: ModelKind,
    /// Parameters keyed by upper-case name
    pub params: HashMap<String, f64>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: HashMap::new(),
        }
    }

    /// Builder-style parameter insert.
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_ascii_uppercase(), value);
        self
    }

    /// Read a model parameter with a default.
    pub fn get(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(&key.to_ascii_uppercase())
            .copied()
            .unwrap_or(default)
    }
}
