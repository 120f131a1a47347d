//! Circuit validation.

use crate::error::{DiscreteError, Result};

use super::{Circuit, Source};

/// Validate a circuit for simulation.
///
/// Checks:
/// - There is at least one output tap
/// - Every module reads only modules evaluated before it
/// - Parameter values and output gains are finite
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.outputs.is_empty() {
        return Err(DiscreteError::MissingOutput);
    }

    for (index, node) in circuit.nodes.iter().enumerate() {
        for source in &node.inputs {
            match *source {
                Source::Output { node: from, .. } if from.0 >= index => {
                    return Err(DiscreteError::ForwardReference {
                        node: node.name.clone(),
                        source_node: circuit.node_name(from).to_string(),
                    });
                }
                Source::Constant(v) if !v.is_finite() => {
                    return Err(DiscreteError::config(&node.name, "constant input is not finite"));
                }
                _ => {}
            }
        }
    }

    for param in &circuit.params {
        if !param.value.is_finite() {
            return Err(DiscreteError::config(&param.name, "parameter value is not finite"));
        }
    }

    for tap in &circuit.outputs {
        if !tap.gain.is_finite() {
            return Err(DiscreteError::config(
                circuit.node_name(tap.node),
                "output gain is not finite",
            ));
        }
    }

    Ok(())
}
