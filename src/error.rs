//! Error types for the netlist simulator.
//!
//! This module provides a unified error type [`NetlistError`] that covers
//! all error conditions that can occur while parsing a netlist description,
//! building and validating a circuit, scheduling events, and solving.
//!
//! Numeric trouble during a running simulation (non-convergence, singular
//! matrices) never escapes [`Simulator::run_until`](crate::Simulator::run_until):
//! the solver degrades and logs instead. The numeric variants exist so the
//! solver internals can report what went wrong.

use thiserror::Error;

use crate::circuit::NetId;
use crate::time::Time;

/// Result type alias using [`NetlistError`].
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Unified error type for all netlist operations.
#[derive(Error, Debug)]
pub enum NetlistError {
    // ============ Description Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    // ============ Configuration Errors ============
    /// Device class not present in the registry
    #[error("Unknown device class '{class}'")]
    UnknownDeviceClass { class: String },

    /// Two devices with the same instance name
    #[error("Duplicate device name '{name}'")]
    DuplicateDevice { name: String },

    /// Device lookup failed
    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    /// Pin or alias lookup failed
    #[error("Pin '{pin}' not found")]
    PinNotFound { pin: String },

    /// A pin or alias name is registered twice
    #[error("Duplicate pin or alias '{name}'")]
    DuplicatePin { name: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for device '{device}': {message}")]
    InvalidParameter {
        device: String,
        param: String,
        message: String,
    },

    /// Undefined model reference
    #[error("Undefined model '{model}' referenced by device '{device}'")]
    UndefinedModel { model: String, device: String },

    /// Duplicate model name
    #[error("Duplicate model name '{name}'")]
    DuplicateModel { name: String },

    /// More than one zero-impedance output drives a net
    #[error("Net '{net}' is driven by both '{first}' and '{second}'")]
    MultipleDrivers {
        net: String,
        first: String,
        second: String,
    },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Scheduling Errors ============
    /// Event scheduled into the past
    #[error("Cannot schedule net {net} with negative delay {delay}")]
    NegativeDelay { net: NetId, delay: Time },

    // ============ Numeric Errors ============
    /// Zero pivot during direct elimination
    #[error("Singular matrix in solver group {group} at row {row}")]
    SingularMatrix { group: usize, row: usize },

    /// Newton-Raphson iteration did not converge
    #[error("Newton-Raphson did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing simulation output
    #[error("Failed to write output: {source}")]
    OutputWriteError {
        #[source]
        source: std::io::Error,
    },
}

impl NetlistError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        device: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            device: device.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a pin-not-found error
    pub fn pin_not_found(pin: impl Into<String>) -> Self {
        Self::PinNotFound { pin: pin.into() }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }
}
