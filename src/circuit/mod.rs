//! Circuit graph representation and validation.
//!
//! A [`Circuit`] is an ordered list of module instances whose inputs are
//! bound to constants, named parameters or outputs of earlier modules, plus
//! the output taps that form the audio signal. Build one from a netlist
//! with [`Circuit::from_ast`] or in code with [`CircuitBuilder`].

mod builder;
mod graph;
mod types;
mod validate;

pub use builder::CircuitBuilder;
pub use graph::{Circuit, Node};
pub use types::*;
pub use validate::validate_circuit;
