//! Logic gates that carry sub-sample transition time (X-time).
//!
//! An X-time signal is `level + fraction`: the integer part is the logic
//! level at the end of the sample, and a non-zero fraction in `(0, 1)` is
//! the instant within the sample at which the signal switched to that
//! level. A fraction of 0 means the level held for the whole sample.
//!
//! Each gate resolves its output level and transition instant from an
//! explicit table over the 16 combinations of input levels and
//! transition flags. Combinations where both inputs moved in a way that
//! could produce a pulse shorter than a sample are resolved to a plain
//! level with no transition.
//!
//! The output is rendered either as X-time logic (`out_low == out_high ==
//! 0`) or as an energy voltage: the time-weighted average of `out_low` and
//! `out_high` over the sample.

use crate::engine::Context;
use crate::error::Result;

use super::Primitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XTimeOp {
    Buffer,
    And,
    Or,
    Xor,
}

/// A decoded X-time input.
#[derive(Debug, Clone, Copy)]
struct Edge {
    high: bool,
    /// Transition instant, 0 when the level held all sample.
    x: f64,
}

impl Edge {
    fn decode(v: f64) -> Self {
        let level = v.trunc();
        let x = v - level;
        Self {
            high: level != 0.0,
            x: if x > 0.0 { x } else { 0.0 },
        }
    }

    fn moved(self) -> bool {
        self.x > 0.0
    }
}

/// Output level and transition instant of an AND of two X-time inputs.
fn and_table(a: Edge, b: Edge) -> (bool, f64) {
    match (a.high, b.high, a.moved(), b.moved()) {
        (true, true, false, false) => (true, 0.0),
        (true, true, false, true) => (true, b.x),
        (true, true, true, false) => (true, a.x),
        (true, true, true, true) => (true, a.x.max(b.x)),
        (false, true, true, false) => (false, a.x),
        (true, false, false, true) => (false, b.x),
        (false, false, true, true) => (false, a.x.min(b.x)),
        // Opposite moves on both inputs: at most a sub-sample glitch
        (false, true, true, true) | (true, false, true, true) => (false, 0.0),
        (false, false, false, false)
        | (false, false, false, true)
        | (false, false, true, false)
        | (false, true, false, false)
        | (false, true, false, true)
        | (true, false, false, false)
        | (true, false, true, false) => (false, 0.0),
    }
}

/// Output level and transition instant of an OR of two X-time inputs.
fn or_table(a: Edge, b: Edge) -> (bool, f64) {
    match (a.high, b.high, a.moved(), b.moved()) {
        (false, false, false, false) => (false, 0.0),
        (false, false, false, true) => (false, b.x),
        (false, false, true, false) => (false, a.x),
        (false, false, true, true) => (false, a.x.max(b.x)),
        (false, true, false, true) => (true, b.x),
        (true, false, true, false) => (true, a.x),
        (true, true, true, true) => (true, a.x.min(b.x)),
        (false, true, true, true) | (true, false, true, true) => (true, 0.0),
        (false, true, false, false)
        | (false, true, true, false)
        | (true, false, false, false)
        | (true, false, false, true)
        | (true, true, false, false)
        | (true, true, false, true)
        | (true, true, true, false) => (true, 0.0),
    }
}

/// Output level and transition instant of an XOR of two X-time inputs.
fn xor_table(a: Edge, b: Edge) -> (bool, f64) {
    match (a.high, b.high, a.moved(), b.moved()) {
        (false, false, false, false) | (true, true, false, false) => (false, 0.0),
        (true, false, true, false) | (false, true, true, false) => (true, a.x),
        (false, true, false, true) | (true, false, false, true) => (true, b.x),
        (false, false, true, false) | (true, true, true, false) => (false, a.x),
        (false, false, false, true) | (true, true, false, true) => (false, b.x),
        // Both moved the same way: output flickers but ends where it began
        (false, false, true, true) | (true, true, true, true) => (false, 0.0),
        (false, true, true, true) | (true, false, true, true) => (true, 0.0),
        (true, false, false, false) | (false, true, false, false) => (true, 0.0),
    }
}

/// X-time buffer or two-input gate.
///
/// Inputs: `in` for the buffer, `in0, in1` for the gates.
#[derive(Debug, Clone)]
pub struct XTimeGate {
    op: XTimeOp,
    invert: bool,
    out_low: f64,
    out_high: f64,
}

impl XTimeGate {
    pub fn new(op: XTimeOp, invert: bool, out_low: f64, out_high: f64) -> Self {
        Self {
            op,
            invert,
            out_low,
            out_high,
        }
    }

    pub fn op(&self) -> XTimeOp {
        self.op
    }

    /// Resolve the output level and transition instant.
    fn resolve(&self, inputs: &[f64]) -> (bool, f64) {
        let a = Edge::decode(inputs[0]);
        let (out, x) = match self.op {
            XTimeOp::Buffer => (a.high, a.x),
            XTimeOp::And => and_table(a, Edge::decode(inputs[1])),
            XTimeOp::Or => or_table(a, Edge::decode(inputs[1])),
            XTimeOp::Xor => xor_table(a, Edge::decode(inputs[1])),
        };
        (out != self.invert, x)
    }

    fn render(&self, out: bool, x: f64) -> f64 {
        if self.out_low == 0.0 && self.out_high == 0.0 {
            return if out { 1.0 } else { 0.0 } + x;
        }
        if x > 0.0 {
            let diff = self.out_high - self.out_low;
            // Time spent high after (rising) or before (falling) the edge
            let high_share = if out { 1.0 - x } else { x };
            self.out_low + diff * high_share
        } else if out {
            self.out_high
        } else {
            self.out_low
        }
    }
}

impl Primitive for XTimeGate {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let (out, x) = self.resolve(inputs);
        outputs[0] = self.render(out, x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Diagnostics, SampleClock};
    use approx::assert_relative_eq;

    fn run(gate: &mut XTimeGate, inputs: &[f64]) -> f64 {
        let clock = SampleClock::new(48000.0).unwrap();
        let mut diag = Diagnostics::new();
        let mut ctx = Context::new("X", &clock, &mut diag);
        let mut out = [0.0];
        gate.step(inputs, &mut out, &mut ctx);
        out[0]
    }

    #[test]
    fn test_buffer_passes_x_time() {
        let mut buf = XTimeGate::new(XTimeOp::Buffer, false, 0.0, 0.0);
        assert_relative_eq!(run(&mut buf, &[1.3]), 1.3);
        let mut inv = XTimeGate::new(XTimeOp::Buffer, true, 0.0, 0.0);
        assert_relative_eq!(run(&mut inv, &[1.3]), 0.3);
        assert_eq!(run(&mut inv, &[0.0]), 1.0);
    }

    #[test]
    fn test_zero_fraction_matches_plain_gate() {
        for (op, truth) in [
            (XTimeOp::And, [0.0, 0.0, 0.0, 1.0]),
            (XTimeOp::Or, [0.0, 1.0, 1.0, 1.0]),
            (XTimeOp::Xor, [0.0, 1.0, 1.0, 0.0]),
        ] {
            let mut gate = XTimeGate::new(op, false, 0.0, 0.0);
            let mut energy = XTimeGate::new(op, false, 0.5, 4.5);
            for (n, expected) in truth.iter().enumerate() {
                let inputs = [(n >> 1) as f64, (n & 1) as f64];
                assert_eq!(run(&mut gate, &inputs), *expected);
                let v = run(&mut energy, &inputs);
                assert_eq!(v, if *expected == 1.0 { 4.5 } else { 0.5 });
            }
        }
    }

    #[test]
    fn test_and_single_transition() {
        let mut gate = XTimeGate::new(XTimeOp::And, false, 0.0, 0.0);
        // in1 rose a quarter of the way in, in0 steady high
        assert_relative_eq!(run(&mut gate, &[1.0, 1.25]), 1.25);
        // in0 fell, in1 steady high
        assert_relative_eq!(run(&mut gate, &[0.4, 1.0]), 0.4);
        // both fell: output fell at the earlier edge
        assert_relative_eq!(run(&mut gate, &[0.6, 0.2]), 0.2);
        // both rose: output rose at the later edge
        assert_relative_eq!(run(&mut gate, &[1.6, 1.2]), 1.6);
        // opposite moves resolve to a plain level
        assert_eq!(run(&mut gate, &[0.6, 1.2]), 0.0);
    }

    #[test]
    fn test_or_and_xor_transitions() {
        let mut or = XTimeGate::new(XTimeOp::Or, false, 0.0, 0.0);
        assert_relative_eq!(run(&mut or, &[0.7, 0.3]), 0.7);
        assert_relative_eq!(run(&mut or, &[1.7, 1.3]), 1.3);
        assert_eq!(run(&mut or, &[0.7, 1.3]), 1.0);

        let mut xor = XTimeGate::new(XTimeOp::Xor, false, 0.0, 0.0);
        assert_relative_eq!(run(&mut xor, &[1.5, 0.0]), 1.5);
        assert_relative_eq!(run(&mut xor, &[1.0, 1.5]), 0.5);
        assert_eq!(run(&mut xor, &[1.5, 1.5]), 0.0);
    }

    #[test]
    fn test_energy_boundaries() {
        let mut gate = XTimeGate::new(XTimeOp::Buffer, false, 0.0, 5.0);
        // Rising early in the sample is almost all high
        assert_relative_eq!(run(&mut gate, &[1.0 + 1e-9]), 5.0, epsilon = 1e-6);
        // Rising at the very end reproduces the previous low output
        assert_relative_eq!(run(&mut gate, &[1.0 + (1.0 - 1e-9)]), 0.0, epsilon = 1e-6);
        // Falling at the very end reproduces the previous high output
        assert_relative_eq!(run(&mut gate, &[1.0 - 1e-9]), 5.0, epsilon = 1e-6);
        assert_relative_eq!(run(&mut gate, &[0.25]), 1.25);
    }

    #[test]
    fn test_late_gate_transitions_keep_previous_output() {
        let late = 1.0 - 1e-9;
        let (rise, fall) = (1.0 + late, late);
        // (op, in0, in1, output level before the transition)
        let cases = [
            (XTimeOp::And, 1.0, rise, 0.0),
            (XTimeOp::And, 1.0, fall, 5.0),
            (XTimeOp::And, rise, 1.0, 0.0),
            (XTimeOp::And, rise, rise, 0.0),
            (XTimeOp::And, fall, fall, 5.0),
            (XTimeOp::Or, 0.0, rise, 0.0),
            (XTimeOp::Or, 0.0, fall, 5.0),
            (XTimeOp::Or, fall, 0.0, 5.0),
            (XTimeOp::Or, rise, rise, 0.0),
            (XTimeOp::Or, fall, fall, 5.0),
            (XTimeOp::Xor, 0.0, rise, 0.0),
            (XTimeOp::Xor, 1.0, rise, 5.0),
            (XTimeOp::Xor, fall, 0.0, 5.0),
            (XTimeOp::Xor, fall, 1.0, 0.0),
            (XTimeOp::Xor, rise, rise, 0.0),
            (XTimeOp::Xor, fall, fall, 0.0),
        ];
        for (op, in0, in1, before) in cases {
            let mut gate = XTimeGate::new(op, false, 0.0, 5.0);
            let v = run(&mut gate, &[in0, in1]);
            assert_relative_eq!(v, before, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_inverted_energy() {
        let mut nand = XTimeGate::new(XTimeOp::And, true, 1.0, 3.0);
        // AND rises at 0.5 so NAND falls at 0.5: half the sample high
        assert_relative_eq!(run(&mut nand, &[1.5, 1.0]), 2.0);
        assert_eq!(run(&mut nand, &[1.0, 1.0]), 1.0);
    }
}
