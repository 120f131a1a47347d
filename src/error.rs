//! Error types for the discrete circuit engine.
//!
//! Only configuration-time problems are errors. Numeric faults that happen
//! while stepping (divide by zero, out-of-range table index) are recovered
//! inside the module and reported through [`crate::engine::Diagnostics`].

use thiserror::Error;

/// Result type alias using [`DiscreteError`].
pub type Result<T> = std::result::Result<T, DiscreteError>;

/// Unified error type for all configuration and I/O failures.
#[derive(Error, Debug)]
pub enum DiscreteError {
    // ============ Netlist Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Unknown module kind keyword
    #[error("Unknown module kind '{kind}' at line {line}")]
    UnknownModuleKind { kind: String, line: usize },

    // ============ Circuit Construction Errors ============
    /// Reference to a node or parameter that was never declared
    #[error("Node or parameter '{name}' not found in circuit")]
    NodeNotFound { name: String },

    /// Reference to an output port a node does not have
    #[error("Node '{node}' has no output port {port} (it has {available})")]
    PortOutOfRange {
        node: String,
        port: usize,
        available: usize,
    },

    /// A node reads a node declared after it
    #[error("Node '{node}' reads '{source_node}', which is not evaluated before it")]
    ForwardReference { node: String, source_node: String },

    /// Duplicate node or parameter name
    #[error("Duplicate name '{name}'")]
    DuplicateName { name: String },

    /// Wrong number of bound inputs for a module kind
    #[error("Node '{node}' expects {expected} inputs, got {got}")]
    InputCount {
        node: String,
        expected: String,
        got: usize,
    },

    /// Circuit has nothing to play
    #[error("Circuit has no output (use '.output <node>')")]
    MissingOutput,

    // ============ Module Configuration Errors ============
    /// Static configuration is inconsistent
    #[error("Invalid configuration for node '{node}': {message}")]
    InvalidConfig { node: String, message: String },

    /// Configuration tables whose lengths must agree do not
    #[error("Node '{node}': table '{table}' has {got} entries, expected {expected}")]
    TableLengthMismatch {
        node: String,
        table: String,
        expected: usize,
        got: usize,
    },

    /// Transform formula contains a character that is not an opcode
    #[error("Node '{node}': invalid transform token '{token}' at position {position} in \"{formula}\"")]
    InvalidTransformToken {
        node: String,
        formula: String,
        token: char,
        position: usize,
    },

    /// Transform formula is structurally unusable (too long, stack misuse)
    #[error("Node '{node}': invalid transform \"{formula}\": {message}")]
    InvalidTransform {
        node: String,
        formula: String,
        message: String,
    },

    /// Sample rate must be positive and finite
    #[error("Invalid sample rate {sample_rate}")]
    InvalidSampleRate { sample_rate: f64 },

    // ============ I/O Errors ============
    /// Error reading netlist file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error reading audio input
    #[error("Audio input error: {message}")]
    AudioInputError { message: String },

    /// Error writing audio output
    #[error("Audio output error: {message}")]
    AudioOutputError { message: String },
}

impl DiscreteError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create a module configuration error
    pub fn config(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Create a table length mismatch error
    pub fn table_length(
        node: impl Into<String>,
        table: impl Into<String>,
        expected: usize,
        got: usize,
    ) -> Self {
        Self::TableLengthMismatch {
            node: node.into(),
            table: table.into(),
            expected,
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_names_formula() {
        let err = DiscreteError::InvalidTransformToken {
            node: "T1".to_string(),
            formula: "01+x".to_string(),
            token: 'x',
            position: 3,
        };
        let text = err.to_string();
        assert!(text.contains("T1"));
        assert!(text.contains("\"01+x\""));
        assert!(text.contains("position 3"));
    }
}
