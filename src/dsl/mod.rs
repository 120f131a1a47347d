//! Netlist language for circuit descriptions.
//!
//! A line-oriented, SPICE-flavoured text format that declares named
//! parameters, module instances in evaluation order, and the output taps.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist     = { line }
//! line        = comment | directive | module | empty
//! comment     = ('#' | ';') { any_char }
//! directive   = ".param" name number
//!             | ".input" name
//!             | ".output" ref [number]
//! module      = kind name { input } { option }
//! input       = number | ref
//! ref         = name [':' port]
//! option      = key '=' ( number | identifier | string | list )
//! list        = '[' [ number { [','] number } ] ']'
//!
//! number      = ['-'|'+'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+] [unit_suffix]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! identifier  = (letter | '_') { letter | digit | '_' }
//! ```
//!
//! An input `ref` names either a parameter or an earlier module (and one of
//! its output ports). Options configure the module; see
//! [`crate::components::Component::from_def`] for the keys of each kind.
//!
//! # Example
//!
//! ```text
//! # 10 ms pulse per trigger, smoothed and scaled
//! .param TRIGGER 0
//! .param VOLUME 0.8
//! .output OUT
//!
//! ONESHOT  PULSE  0 TRIGGER 5 10m
//! MIXER    MIX    1 PULSE        r=[10k] c_f=0.1u
//! GAIN     OUT    MIX VOLUME
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::DiscreteError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}
