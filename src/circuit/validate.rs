//! Circuit validation.

use crate::error::{NetlistError, Result};

use super::net::TerminalKind;
use super::Circuit;

/// Validate a circuit before it is finalised.
///
/// Checks:
/// - There is at least one device besides the ground rail
/// - Every branch terminal has a partner on the same device
/// - Every terminal belongs to a device
/// - Every driven net still holds its driver
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.devices.len() <= 1 {
        return Err(NetlistError::InvalidTopology {
            message: "netlist has no devices".to_string(),
        });
    }

    for term in &circuit.state.terminals {
        if term.device.0 >= circuit.devices.len() {
            return Err(NetlistError::InvalidTopology {
                message: format!("terminal {} belongs to no device", term.name),
            });
        }
        if term.kind != TerminalKind::Terminal {
            continue;
        }
        match term.other {
            Some(other) if circuit.state.terminal(other).device == term.device => {}
            _ => {
                return Err(NetlistError::InvalidTopology {
                    message: format!("branch terminal {} has no partner", term.name),
                });
            }
        }
    }

    for net in &circuit.state.nets {
        if let Some(d) = net.driver {
            if !net.terminals.contains(&d) {
                return Err(NetlistError::InvalidTopology {
                    message: format!("net {} lost its driver", net.name),
                });
            }
        }
    }

    Ok(())
}
