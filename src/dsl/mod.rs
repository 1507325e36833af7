//! Text netlist description language.
//!
//! The language is line oriented. Each line instantiates a device or holds
//! a directive; `#` and `;` start a comment.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist     = { line }
//! line        = device | directive | empty
//! device      = class name { pin | value } { key '=' value }
//! directive   = '.connect' pin pin { pin }
//!             | '.alias' alias pin
//!             | '.param' device '.' param value
//!             | '.model' name ('D' | 'NPN' | 'PNP') [ '(' ] { key '=' number } [ ')' ]
//!             | '.solver' { key '=' value }
//!             | '.probe' pin { pin }
//!             | '.stimulus' device time number
//!
//! pin         = device '.' pin_name | alias
//! value       = number | identifier
//! number      = ['-'|'+'] digits ['.' digits] [('e'|'E') ['-'|'+'] digits] [suffix]
//! suffix      = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! time        = number ['s']
//! ```
//!
//! Numeric positionals fill the class's positional parameters in order,
//! identifier positionals connect the class's pins in declared order.
//!
//! # Example
//!
//! ```text
//! # Inverter driving an RC load
//! LOGIC_INPUT    A
//! TTL_7404_INVERT U1 A.Q
//! RES  R1 1k
//! CAP  C1 1u
//! .connect U1.Q R1.1
//! .connect R1.2 C1.1
//! .connect C1.2 GND
//! .probe U1.Q
//! .stimulus A 1ms 1
//! ```

mod ast;
mod lexer;
mod parser;

use std::path::Path;

pub use ast::*;
pub use lexer::{parse_time_value, parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::{NetlistError, Result};

/// Parse a netlist description into an AST.
pub fn parse(input: &str) -> Result<NetlistAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Read and parse a netlist file.
pub fn parse_file(path: &Path) -> Result<NetlistAst> {
    let content = std::fs::read_to_string(path).map_err(|e| NetlistError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
