//! Circuit representation and setup.
//!
//! Nets and terminals live in the [`NetState`] arena and refer to each other
//! through integer handles. A [`Circuit`] instantiates devices into the
//! arena, wires their pins together and, once finalised, is turned into a
//! [`Simulator`](crate::Simulator).

mod graph;
mod net;
mod types;
mod validate;

pub use graph::{Circuit, Names, GND};
pub use net::{Domain, InputState, Net, NetState, Terminal, TerminalKind};
pub use types::*;
pub use validate::validate_circuit;
