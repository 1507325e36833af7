//! Abstract Syntax Tree types for the netlist description language.

use crate::devices::{ModelDef, ParamValue, Params};
use crate::time::Time;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct NetlistAst {
    /// Device instances in file order
    pub devices: Vec<DeviceDef>,
    /// `.connect` directives
    pub connections: Vec<ConnectDef>,
    /// `.alias` directives
    pub aliases: Vec<AliasDef>,
    /// `.param` overrides
    pub params: Vec<ParamDef>,
    /// `.model` cards
    pub models: Vec<ModelCard>,
    /// `.solver` settings
    pub solver: Vec<SolverSetting>,
    /// `.probe` directives
    pub probes: Vec<ProbeDef>,
    /// `.stimulus` directives
    pub stimuli: Vec<Stimulus>,
}

impl NetlistAst {
    /// Create a new empty netlist AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A device instantiation, e.g. `RES R1 1k` or `TTL_7400_NAND U1 A.Q B.Q`.
#[derive(Debug, Clone)]
pub struct DeviceDef {
    /// Registry class name
    pub class: String,
    /// Unique instance name
    pub name: String,
    /// Positional pin connections, in the class's pin order
    pub pins: Vec<String>,
    /// Positional numeric values, in the class's parameter order
    pub values: Vec<f64>,
    /// `key=value` parameters
    pub params: Params,
    /// Source line number for error reporting
    pub line: usize,
}

/// `.connect <pin> <pin> [<pin>...]`
#[derive(Debug, Clone)]
pub struct ConnectDef {
    pub pins: Vec<String>,
    pub line: usize,
}

/// `.alias <alias> <pin>`
#[derive(Debug, Clone)]
pub struct AliasDef {
    pub alias: String,
    pub pin: String,
    pub line: usize,
}

/// `.param <device>.<param> <value>`
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub device: String,
    pub param: String,
    pub value: ParamValue,
    pub line: usize,
}

/// `.model <name> <kind> (key=value ...)`
#[derive(Debug, Clone)]
pub struct ModelCard {
    pub model: ModelDef,
    pub line: usize,
}

/// One `key=value` pair of a `.solver` directive.
#[derive(Debug, Clone)]
pub struct SolverSetting {
    pub key: String,
    pub value: f64,
    pub line: usize,
}

/// `.probe <pin>`
#[derive(Debug, Clone)]
pub struct ProbeDef {
    pub pin: String,
    pub line: usize,
}

/// `.stimulus <device> <time> <value>`: set the device's `IN` parameter at
/// the given time.
#[derive(Debug, Clone)]
pub struct Stimulus {
    pub device: String,
    pub time: Time,
    pub value: f64,
    pub line: usize,
}
