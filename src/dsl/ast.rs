//! Abstract Syntax Tree types for the netlist language.

use std::collections::HashMap;

pub use crate::circuit::Input;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct CircuitAst {
    /// Module instances, in evaluation order
    pub modules: Vec<ModuleDef>,
    /// Named parameters
    pub params: Vec<ParamDef>,
    /// Parameter driven by the input stream
    pub input: Option<String>,
    /// Output taps, summed into the audio output
    pub outputs: Vec<OutputDef>,
}

impl CircuitAst {
    /// Create a new empty circuit AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// `.param NAME value`
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub value: f64,
    pub line: usize,
}

/// `.output NODE[:port] [gain]`
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDef {
    pub node: String,
    pub port: usize,
    pub gain: f64,
    pub line: usize,
}

/// A module line: `KIND NAME input* key=value*`.
#[derive(Debug, Clone)]
pub struct ModuleDef {
    pub kind: ModuleKind,
    /// Unique node name
    pub name: String,
    /// Bound inputs in slot order
    pub inputs: Vec<Input>,
    /// Static configuration, keys lowercased
    pub options: HashMap<String, OptionValue>,
    /// Source line number for error reporting
    pub line: usize,
}

/// Value of a `key=value` option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Number(f64),
    /// Bare word such as `TRG0_INV` or `RISING`
    Ident(String),
    /// Quoted string
    Text(String),
    /// `[a, b, c]`
    List(Vec<f64>),
}

impl OptionValue {
    /// Short description of the variant for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Number(_) => "number",
            OptionValue::Ident(_) => "word",
            OptionValue::Text(_) => "string",
            OptionValue::List(_) => "list",
        }
    }
}

/// Module kinds understood by the netlist language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Adder,
    Gain,
    Divide,
    Clamp,
    Lookup,
    DiodeMix,
    Integrator,
    OpAmp,
    OpAmpOneShot,
    Tvca,
    DacR1,
    CompAdder,
    Mixer,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
    Not,
    DFlipFlop,
    JkFlipFlop,
    Shift,
    BitsDecode,
    XTimeBuffer,
    XTimeAnd,
    XTimeOr,
    XTimeXor,
    SampleHold,
    Switch,
    AnalogSwitch,
    Multiplex,
    OneShot,
    Ramp,
    Transform,
}

impl ModuleKind {
    /// Parse a module kind from its keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "ADDER" | "ADD" => Some(Self::Adder),
            "GAIN" => Some(Self::Gain),
            "DIVIDE" | "DIV" => Some(Self::Divide),
            "CLAMP" => Some(Self::Clamp),
            "LOOKUP" => Some(Self::Lookup),
            "DIODE_MIX" => Some(Self::DiodeMix),
            "INTEGRATOR" | "INTEGRATE" => Some(Self::Integrator),
            "OPAMP" | "OP_AMP" => Some(Self::OpAmp),
            "OPAMP_ONESHOT" | "OP_AMP_ONESHOT" => Some(Self::OpAmpOneShot),
            "TVCA" | "TVCA_OP_AMP" => Some(Self::Tvca),
            "DAC_R1" => Some(Self::DacR1),
            "COMP_ADDER" => Some(Self::CompAdder),
            "MIXER" => Some(Self::Mixer),
            "AND" => Some(Self::And),
            "NAND" => Some(Self::Nand),
            "OR" => Some(Self::Or),
            "NOR" => Some(Self::Nor),
            "XOR" => Some(Self::Xor),
            "XNOR" => Some(Self::Xnor),
            "NOT" | "INVERT" => Some(Self::Not),
            "DFF" => Some(Self::DFlipFlop),
            "JKFF" => Some(Self::JkFlipFlop),
            "SHIFT" => Some(Self::Shift),
            "BITS_DECODE" => Some(Self::BitsDecode),
            "XTIME_BUFFER" => Some(Self::XTimeBuffer),
            "XTIME_AND" => Some(Self::XTimeAnd),
            "XTIME_OR" => Some(Self::XTimeOr),
            "XTIME_XOR" => Some(Self::XTimeXor),
            "SAMPHOLD" => Some(Self::SampleHold),
            "SWITCH" => Some(Self::Switch),
            "ASWITCH" => Some(Self::AnalogSwitch),
            "MULTIPLEX" | "MUX" => Some(Self::Multiplex),
            "ONESHOT" => Some(Self::OneShot),
            "RAMP" => Some(Self::Ramp),
            "TRANSFORM" => Some(Self::Transform),
            _ => None,
        }
    }
}
