//! Postfix formula module.
//!
//! A formula is a string of single-character opcodes evaluated left to right
//! by a small stack machine with the most recent value held in a `top`
//! register:
//!
//! | Token       | Effect                                        |
//! |-------------|-----------------------------------------------|
//! | `0`..`4`    | push input 0..4                               |
//! | `P`         | duplicate top                                 |
//! | `+ - * /`   | `second op top`                               |
//! | `i` `a` `!` | negate, absolute value, logical not           |
//! | `= > <`     | comparison, 1.0 or 0.0 (`=` compares as ints) |
//! | `& \| ^`    | bitwise and/or/xor of the integer parts       |
//!
//! Whitespace is ignored. The formula is compiled once at reset and any
//! program that could under- or overflow the stack is rejected there, so
//! evaluation cannot fail.

use crate::engine::Context;
use crate::error::{DiscreteError, Result};

use super::Primitive;

/// Number of inputs a formula can address.
pub const TRANSFORM_INPUTS: usize = 5;
/// Maximum compiled program length.
pub const MAX_TRANSFORM_OPS: usize = 32;
/// Maximum number of live values, the `top` register included.
pub const MAX_TRANSFORM_STACK: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Input(u8),
    Dup,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Abs,
    Not,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Xor,
}

impl Op {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '0'..='4' => Op::Input(c as u8 - b'0'),
            'P' => Op::Dup,
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            'i' => Op::Neg,
            'a' => Op::Abs,
            '!' => Op::Not,
            '=' => Op::Eq,
            '>' => Op::Gt,
            '<' => Op::Lt,
            '&' => Op::And,
            '|' => Op::Or,
            '^' => Op::Xor,
            _ => return None,
        })
    }

    /// Values consumed and produced.
    fn arity(self) -> (usize, usize) {
        match self {
            Op::Input(_) => (0, 1),
            Op::Dup => (1, 2),
            Op::Neg | Op::Abs | Op::Not => (1, 1),
            _ => (2, 1),
        }
    }
}

/// A compiled formula.
#[derive(Debug, Clone)]
pub struct Program {
    ops: [Op; MAX_TRANSFORM_OPS],
    len: usize,
}

/// Compile `formula` for node `node`.
pub fn compile(node: &str, formula: &str) -> Result<Program> {
    let invalid = |message: String| DiscreteError::InvalidTransform {
        node: node.to_string(),
        formula: formula.to_string(),
        message,
    };

    let mut program = Program {
        ops: [Op::Dup; MAX_TRANSFORM_OPS],
        len: 0,
    };
    // Live values, `top` included
    let mut depth = 0usize;

    for (position, c) in formula.chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        let op = Op::from_char(c).ok_or_else(|| DiscreteError::InvalidTransformToken {
            node: node.to_string(),
            formula: formula.to_string(),
            token: c,
            position,
        })?;

        let (takes, gives) = op.arity();
        if depth < takes {
            return Err(invalid(format!(
                "'{c}' at position {position} needs {takes} value(s), stack has {depth}"
            )));
        }
        depth = depth - takes + gives;
        if depth > MAX_TRANSFORM_STACK {
            return Err(invalid(format!(
                "stack deeper than {MAX_TRANSFORM_STACK} at position {position}"
            )));
        }
        if program.len == MAX_TRANSFORM_OPS {
            return Err(invalid(format!("more than {MAX_TRANSFORM_OPS} operations")));
        }
        program.ops[program.len] = op;
        program.len += 1;
    }

    if depth == 0 {
        return Err(invalid("formula produces no value".to_string()));
    }
    Ok(program)
}

/// Value stack with the most recent value held in `top`.
struct Machine {
    stack: [f64; MAX_TRANSFORM_STACK],
    sp: usize,
    top: f64,
    live: bool,
}

impl Machine {
    fn push(&mut self, v: f64) {
        if self.live {
            self.stack[self.sp] = self.top;
            self.sp += 1;
        }
        self.live = true;
        self.top = v;
    }

    fn pop(&mut self) -> f64 {
        self.sp -= 1;
        self.stack[self.sp]
    }

    fn binary(&mut self, f: impl Fn(f64, f64) -> f64) {
        let second = self.pop();
        self.top = f(second, self.top);
    }
}

/// Run a compiled program. Inputs beyond the slice read as 0.
pub fn evaluate(program: &Program, inputs: &[f64]) -> f64 {
    // Depth was checked at compile time
    let mut m = Machine {
        stack: [0.0; MAX_TRANSFORM_STACK],
        sp: 0,
        top: 0.0,
        live: false,
    };

    for op in &program.ops[..program.len] {
        match *op {
            Op::Input(n) => m.push(inputs.get(n as usize).copied().unwrap_or(0.0)),
            Op::Dup => m.push(m.top),
            Op::Add => m.binary(|a, b| a + b),
            Op::Sub => m.binary(|a, b| a - b),
            Op::Mul => m.binary(|a, b| a * b),
            Op::Div => m.binary(|a, b| a / b),
            Op::Neg => m.top = -m.top,
            Op::Abs => m.top = m.top.abs(),
            Op::Not => m.top = bool_value(m.top == 0.0),
            Op::Eq => m.binary(|a, b| bool_value(a as i64 == b as i64)),
            Op::Gt => m.binary(|a, b| bool_value(a > b)),
            Op::Lt => m.binary(|a, b| bool_value(a < b)),
            Op::And => m.binary(|a, b| (a as i64 & b as i64) as f64),
            Op::Or => m.binary(|a, b| (a as i64 | b as i64) as f64),
            Op::Xor => m.binary(|a, b| (a as i64 ^ b as i64) as f64),
        }
    }
    m.top
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Transform module. Inputs: `in0 .. in4` (missing inputs read as 0).
#[derive(Debug, Clone)]
pub struct Transform {
    formula: String,
    program: Option<Program>,
}

impl Transform {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            program: None,
        }
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }
}

impl Primitive for Transform {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.program = Some(compile(ctx.node(), &self.formula)?);
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = match &self.program {
            Some(program) => evaluate(program, inputs),
            None => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(formula: &str, inputs: &[f64]) -> f64 {
        let program = compile("T", formula).unwrap();
        evaluate(&program, inputs)
    }

    #[test]
    fn test_sum_then_multiply() {
        assert_relative_eq!(eval("01+2*", &[2.0, 3.0, 10.0]), 50.0);
        assert_relative_eq!(eval("0 1 + 2 *", &[2.0, 3.0, 10.0]), 50.0);
    }

    #[test]
    fn test_operand_order() {
        assert_relative_eq!(eval("01-", &[10.0, 4.0]), 6.0);
        assert_relative_eq!(eval("01/", &[10.0, 4.0]), 2.5);
        assert_eq!(eval("01>", &[10.0, 4.0]), 1.0);
        assert_eq!(eval("01<", &[10.0, 4.0]), 0.0);
    }

    #[test]
    fn test_unary_and_bitwise() {
        assert_relative_eq!(eval("0ia", &[-3.5]), 3.5);
        assert_relative_eq!(eval("0i", &[3.5]), -3.5);
        assert_eq!(eval("0!", &[0.0]), 1.0);
        assert_eq!(eval("0!", &[2.0]), 0.0);
        assert_eq!(eval("01&", &[6.0, 3.0]), 2.0);
        assert_eq!(eval("01|", &[6.0, 3.0]), 7.0);
        assert_eq!(eval("01^", &[6.0, 3.0]), 5.0);
        assert_eq!(eval("01=", &[2.7, 2.1]), 1.0);
        assert_relative_eq!(eval("0P*", &[3.0]), 9.0);
    }

    #[test]
    fn test_all_five_inputs() {
        assert_relative_eq!(eval("01+2+3+4+", &[1.0, 2.0, 3.0, 4.0, 5.0]), 15.0);
        // Unbound inputs read as 0
        assert_relative_eq!(eval("04+", &[1.0]), 1.0);
    }

    #[test]
    fn test_bad_token_reports_position() {
        match compile("T1", "01+x") {
            Err(DiscreteError::InvalidTransformToken {
                node,
                formula,
                token,
                position,
            }) => {
                assert_eq!(node, "T1");
                assert_eq!(formula, "01+x");
                assert_eq!(token, 'x');
                assert_eq!(position, 3);
            }
            other => panic!("expected token error, got {:?}", other),
        }
        assert!(matches!(compile("T1", "5"), Err(DiscreteError::InvalidTransformToken { .. })));
    }

    #[test]
    fn test_stack_misuse_rejected() {
        assert!(matches!(compile("T", "0+"), Err(DiscreteError::InvalidTransform { .. })));
        assert!(matches!(compile("T", "i"), Err(DiscreteError::InvalidTransform { .. })));
        assert!(matches!(compile("T", ""), Err(DiscreteError::InvalidTransform { .. })));
        let deep = "0".repeat(MAX_TRANSFORM_STACK + 1);
        assert!(matches!(compile("T", &deep), Err(DiscreteError::InvalidTransform { .. })));
        let long = "0i".repeat(MAX_TRANSFORM_OPS / 2 + 1);
        assert!(matches!(compile("T", &long), Err(DiscreteError::InvalidTransform { .. })));
        // A full stack is still allowed
        let full = "0".repeat(MAX_TRANSFORM_STACK);
        assert!(compile("T", &full).is_ok());
    }

    #[test]
    fn test_module_compiles_at_reset() {
        use crate::engine::{Diagnostics, SampleClock};
        let clock = SampleClock::new(48000.0).unwrap();
        let mut diag = Diagnostics::new();
        let mut ctx = Context::new("T", &clock, &mut diag);
        let mut out = [0.0];

        let mut t = Transform::new("01*");
        t.reset(&[3.0, 4.0], &mut out, &mut ctx).unwrap();
        assert_relative_eq!(out[0], 12.0);

        let mut bad = Transform::new("0?");
        assert!(bad.reset(&[3.0], &mut out, &mut ctx).is_err());
    }
}
