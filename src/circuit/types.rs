//! Core types for circuit representation.

use std::fmt;

/// Index of a module instance, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Index of a named graph parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub usize);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// An input binding as written by the user: a constant or a name.
///
/// A name refers to a parameter or to output `port` of a module.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(f64),
    Ref { name: String, port: usize },
}

impl Input {
    /// Output 0 of a module, or a parameter.
    pub fn named(name: impl Into<String>) -> Self {
        Input::Ref {
            name: name.into(),
            port: 0,
        }
    }

    /// A specific output port of a module.
    pub fn port(name: impl Into<String>, port: usize) -> Self {
        Input::Ref {
            name: name.into(),
            port,
        }
    }
}

impl From<f64> for Input {
    fn from(v: f64) -> Self {
        Input::Value(v)
    }
}

impl From<&str> for Input {
    fn from(name: &str) -> Self {
        Input::named(name)
    }
}

/// A resolved input binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Constant(f64),
    Param(ParamId),
    Output { node: NodeId, port: usize },
}

/// What a name in the circuit's namespace refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Node(NodeId),
    Param(ParamId),
}

/// A named parameter and its initial value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: f64,
}

/// One output of the circuit, summed into the audio stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputTap {
    pub node: NodeId,
    pub port: usize,
    pub gain: f64,
}
