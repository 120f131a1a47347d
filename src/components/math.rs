//! Summing, gain and lookup primitives.

use crate::engine::{Context, Fault, FaultLatch};
use crate::error::{DiscreteError, Result};

use super::Primitive;

/// Sums its inputs while enabled.
///
/// Inputs: `enable, in0 .. inN`.
#[derive(Debug, Clone, Default)]
pub struct Adder;

impl Primitive for Adder {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = if inputs[0] != 0.0 {
            inputs[1..].iter().sum()
        } else {
            0.0
        };
    }
}

/// `in * gain + offset`.
///
/// Inputs: `in, gain, offset`.
#[derive(Debug, Clone, Default)]
pub struct Gain;

impl Primitive for Gain {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = inputs[0] * inputs[1] + inputs[2];
    }
}

/// `in / divisor` while enabled.
///
/// Inputs: `in, divisor, enable`. A zero divisor outputs `f64::MAX` and is
/// reported once per run of zero-divisor samples.
#[derive(Debug, Clone, Default)]
pub struct Divider {
    zero_divisor: FaultLatch,
}

impl Primitive for Divider {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        self.zero_divisor = FaultLatch::default();
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let (input, divisor, enable) = (inputs[0], inputs[1], inputs[2]);
        if enable == 0.0 {
            outputs[0] = 0.0;
            return;
        }
        if divisor == 0.0 {
            self.zero_divisor.trip(ctx, Fault::DivideByZero, input);
            outputs[0] = f64::MAX;
        } else {
            self.zero_divisor.clear();
            outputs[0] = input / divisor;
        }
    }
}

/// Bounds its input to `[min, max]`.
///
/// Inputs: `in, min, max`.
#[derive(Debug, Clone, Default)]
pub struct Clamp;

impl Primitive for Clamp {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let (input, min, max) = (inputs[0], inputs[1], inputs[2]);
        outputs[0] = if input < min {
            min
        } else if input > max {
            max
        } else {
            input
        };
    }
}

/// Static table indexed by the truncated input.
#[derive(Debug, Clone)]
pub struct Lookup {
    table: Vec<f64>,
    out_of_range: FaultLatch,
}

impl Lookup {
    pub fn new(table: Vec<f64>) -> Self {
        Self {
            table,
            out_of_range: FaultLatch::default(),
        }
    }
}

impl Primitive for Lookup {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        if self.table.is_empty() {
            return Err(DiscreteError::config(ctx.node(), "lookup table is empty"));
        }
        self.out_of_range = FaultLatch::default();
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let index = inputs[0].trunc();
        if index >= 0.0 && index < self.table.len() as f64 {
            self.out_of_range.clear();
            outputs[0] = self.table[index as usize];
        } else {
            self.out_of_range.trip(ctx, Fault::IndexOutOfRange, inputs[0]);
            outputs[0] = 0.0;
        }
    }
}

/// Diode-OR of its inputs: the highest `in - v_junction`, never below 0.
#[derive(Debug, Clone)]
pub struct DiodeMix {
    /// Per-input junction drop; empty means 0.5V on every input.
    junction: Vec<f64>,
}

impl DiodeMix {
    pub const DEFAULT_JUNCTION: f64 = 0.5;

    pub fn new(junction: Vec<f64>) -> Self {
        Self { junction }
    }

    fn junction(&self, input: usize) -> f64 {
        self.junction.get(input).copied().unwrap_or(Self::DEFAULT_JUNCTION)
    }
}

impl Primitive for DiodeMix {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        if !self.junction.is_empty() && self.junction.len() != inputs.len() {
            return Err(DiscreteError::table_length(
                ctx.node(),
                "junction",
                inputs.len(),
                self.junction.len(),
            ));
        }
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let mut max = 0.0f64;
        for (n, &v) in inputs.iter().enumerate() {
            max = max.max(v - self.junction(n));
        }
        outputs[0] = max;
    }
}
