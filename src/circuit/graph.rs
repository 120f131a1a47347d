//! Circuit graph structure.

use std::collections::{HashMap, HashSet};

use super::builder::CircuitBuilder;
use super::types::{NodeId, OutputTap, Param, ParamId, Source, Symbol};
use crate::components::Component;
use crate::dsl::CircuitAst;
use crate::error::{DiscreteError, Result};

/// A module instance with its resolved inputs.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub component: Component,
    /// One source per input slot, optional slots already defaulted
    pub inputs: Vec<Source>,
    pub num_outputs: usize,
}

/// A complete circuit ready for simulation.
///
/// Nodes are stored in evaluation order and only read nodes before them.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub(crate) nodes: Vec<Node>,
    pub(crate) params: Vec<Param>,
    pub(crate) outputs: Vec<OutputTap>,
    pub(crate) input: Option<ParamId>,
    pub(crate) names: HashMap<String, Symbol>,
}

impl Circuit {
    /// Build a circuit from a parsed AST.
    ///
    /// Parameters are declared first, so a module may read a parameter
    /// declared further down the netlist. Modules must appear after every
    /// module they read.
    pub fn from_ast(ast: CircuitAst) -> Result<Self> {
        let mut builder = CircuitBuilder::new();

        for param in &ast.params {
            builder.param(&param.name, param.value)?;
        }

        let module_names: HashSet<&str> = ast.modules.iter().map(|m| m.name.as_str()).collect();

        for def in &ast.modules {
            let component = Component::from_def(def)?;
            builder
                .node(&def.name, component, def.inputs.iter().cloned())
                .map_err(|e| match e {
                    DiscreteError::NodeNotFound { name } if module_names.contains(name.as_str()) => {
                        DiscreteError::ForwardReference {
                            node: def.name.clone(),
                            source_node: name,
                        }
                    }
                    other => other,
                })?;
        }

        for output in &ast.outputs {
            builder.output(&output.node, output.port, output.gain)?;
        }
        if let Some(input) = &ast.input {
            builder.input(input)?;
        }

        builder.build()
    }

    /// Modules in evaluation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn outputs(&self) -> &[OutputTap] {
        &self.outputs
    }

    /// Parameter driven by the input stream, if any.
    pub fn input_param(&self) -> Option<ParamId> {
        self.input
    }

    /// Find a module by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        match self.names.get(name) {
            Some(Symbol::Node(id)) => Some(*id),
            _ => None,
        }
    }

    /// Find a parameter by name.
    pub fn find_param(&self, name: &str) -> Option<ParamId> {
        match self.names.get(name) {
            Some(Symbol::Param(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get the name of a module.
    pub fn node_name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }
}
