//! Programmatic circuit construction.

use std::collections::HashMap;

use super::graph::{Circuit, Node};
use super::types::{Input, NodeId, OutputTap, Param, ParamId, Source, Symbol};
use super::validate::validate_circuit;
use crate::components::Component;
use crate::engine::MAX_INPUTS;
use crate::error::{DiscreteError, Result};

/// Builds a [`Circuit`] one declaration at a time.
///
/// Modules are evaluated in the order they are added, so a module can only
/// read parameters and modules added before it.
///
/// ```
/// use discrete_core::circuit::{CircuitBuilder, Input};
/// use discrete_core::components::{Adder, Component, Gain};
///
/// let mut builder = CircuitBuilder::new();
/// builder.param("LEVEL", 0.5).unwrap();
/// builder
///     .node("SUM", Component::Adder(Adder), [Input::from(1.0), 2.0.into(), 3.0.into()])
///     .unwrap();
/// builder
///     .node("OUT", Component::Gain(Gain), ["SUM".into(), "LEVEL".into()])
///     .unwrap();
/// builder.output("OUT", 0, 1.0).unwrap();
/// let circuit = builder.build().unwrap();
/// assert_eq!(circuit.nodes().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct CircuitBuilder {
    nodes: Vec<Node>,
    params: Vec<Param>,
    outputs: Vec<OutputTap>,
    input: Option<ParamId>,
    names: HashMap<String, Symbol>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, name: &str, symbol: Symbol) -> Result<()> {
        if self.names.contains_key(name) {
            return Err(DiscreteError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.names.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Declare a named parameter.
    pub fn param(&mut self, name: &str, value: f64) -> Result<ParamId> {
        let id = ParamId(self.params.len());
        self.claim(name, Symbol::Param(id))?;
        self.params.push(Param {
            name: name.to_string(),
            value,
        });
        Ok(id)
    }

    fn resolve(&self, input: Input) -> Result<Source> {
        let (name, port) = match input {
            Input::Value(v) => return Ok(Source::Constant(v)),
            Input::Ref { name, port } => (name, port),
        };
        match self.names.get(&name) {
            Some(Symbol::Param(id)) if port == 0 => Ok(Source::Param(*id)),
            Some(Symbol::Param(_)) => Err(DiscreteError::PortOutOfRange {
                node: name,
                port,
                available: 1,
            }),
            Some(Symbol::Node(id)) => {
                let available = self.nodes[id.0].num_outputs;
                if port < available {
                    Ok(Source::Output { node: *id, port })
                } else {
                    Err(DiscreteError::PortOutOfRange {
                        node: name,
                        port,
                        available,
                    })
                }
            }
            None => Err(DiscreteError::NodeNotFound { name }),
        }
    }

    /// Add a module reading `inputs`, which are resolved against the
    /// parameters and modules declared so far.
    pub fn node<I>(&mut self, name: &str, component: Component, inputs: I) -> Result<NodeId>
    where
        I: IntoIterator<Item = Input>,
    {
        if self.names.contains_key(name) {
            return Err(DiscreteError::DuplicateName {
                name: name.to_string(),
            });
        }

        let mut sources = inputs
            .into_iter()
            .map(|input| self.resolve(input))
            .collect::<Result<Vec<_>>>()?;

        let spec = component.input_spec();
        let bound = sources.len();
        if bound < spec.min || bound > spec.max {
            return Err(DiscreteError::InputCount {
                node: name.to_string(),
                expected: spec.describe(),
                got: bound,
            });
        }
        let slots = spec.slots(bound);
        if slots > MAX_INPUTS {
            return Err(DiscreteError::config(
                name,
                format!("{} inputs exceed the limit of {}", slots, MAX_INPUTS),
            ));
        }
        for slot in bound..slots {
            sources.push(Source::Constant(spec.defaults[slot - spec.min]));
        }

        let id = NodeId(self.nodes.len());
        self.claim(name, Symbol::Node(id))?;
        self.nodes.push(Node {
            name: name.to_string(),
            num_outputs: component.num_outputs(),
            component,
            inputs: sources,
        });
        Ok(id)
    }

    /// Add `port` of module `node`, scaled by `gain`, to the circuit output.
    pub fn output(&mut self, node: &str, port: usize, gain: f64) -> Result<()> {
        match self.resolve(Input::port(node, port))? {
            Source::Output { node, port } => {
                self.outputs.push(OutputTap { node, port, gain });
                Ok(())
            }
            _ => Err(DiscreteError::config(node, "only a module can be an output")),
        }
    }

    /// Drive parameter `param` from the input stream.
    pub fn input(&mut self, param: &str) -> Result<ParamId> {
        match self.names.get(param) {
            Some(Symbol::Param(id)) => {
                self.input = Some(*id);
                Ok(*id)
            }
            Some(Symbol::Node(_)) => Err(DiscreteError::config(
                param,
                "only a parameter can be driven by the input stream",
            )),
            None => Err(DiscreteError::NodeNotFound {
                name: param.to_string(),
            }),
        }
    }

    /// Finish construction.
    pub fn build(self) -> Result<Circuit> {
        let circuit = Circuit {
            nodes: self.nodes,
            params: self.params,
            outputs: self.outputs,
            input: self.input,
            names: self.names,
        };
        validate_circuit(&circuit)?;
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Adder, BitsDecode, Divider, Gain};

    #[test]
    fn test_defaults_fill_optional_slots() {
        let mut b = CircuitBuilder::new();
        b.node("G", Component::Gain(Gain), [Input::Value(2.0)]).unwrap();
        b.node("D", Component::Divider(Divider::default()), ["G".into(), 4.0.into()])
            .unwrap();
        b.output("D", 0, 1.0).unwrap();
        let circuit = b.build().unwrap();
        assert_eq!(
            circuit.nodes()[0].inputs,
            vec![Source::Constant(2.0), Source::Constant(1.0), Source::Constant(0.0)]
        );
        assert_eq!(circuit.nodes()[1].inputs[2], Source::Constant(1.0));
    }

    #[test]
    fn test_input_count_and_ports_checked() {
        let mut b = CircuitBuilder::new();
        let err = b.node("A", Component::Adder(Adder), [Input::Value(1.0)]).unwrap_err();
        assert!(matches!(err, DiscreteError::InputCount { got: 1, .. }));

        b.node("B", Component::BitsDecode(BitsDecode::new(0, 3, 0.0)), [Input::Value(5.0)])
            .unwrap();
        assert!(b.output("B", 3, 1.0).is_ok());
        assert!(matches!(
            b.output("B", 4, 1.0),
            Err(DiscreteError::PortOutOfRange { available: 4, .. })
        ));
    }

    #[test]
    fn test_names_are_unique_and_resolved() {
        let mut b = CircuitBuilder::new();
        b.param("X", 1.0).unwrap();
        assert!(matches!(b.param("X", 2.0), Err(DiscreteError::DuplicateName { .. })));
        assert!(matches!(
            b.node("X", Component::Gain(Gain), [Input::Value(1.0)]),
            Err(DiscreteError::DuplicateName { .. })
        ));
        assert!(matches!(
            b.node("G", Component::Gain(Gain), ["MISSING".into()]),
            Err(DiscreteError::NodeNotFound { .. })
        ));
        b.node("G", Component::Gain(Gain), ["X".into()]).unwrap();
        assert!(b.input("G").is_err());
        assert_eq!(b.input("X").unwrap(), ParamId(0));
    }

    #[test]
    fn test_build_requires_output() {
        let mut b = CircuitBuilder::new();
        b.node("G", Component::Gain(Gain), [Input::Value(1.0)]).unwrap();
        assert!(matches!(b.build(), Err(DiscreteError::MissingOutput)));
    }
}
