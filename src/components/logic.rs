//! Digital logic primitives.
//!
//! Logic levels are `0.0` and `1.0`; any non-zero input reads as high.

use crate::engine::{Context, Fault, FaultLatch};
use crate::error::{DiscreteError, Result};

use super::Primitive;

#[inline]
fn level(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// Gates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOp {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
}

/// Combinational gate. AND/NAND/OR/NOR take up to 4 inputs, XOR/XNOR two.
#[derive(Debug, Clone)]
pub struct LogicGate {
    op: GateOp,
}

impl LogicGate {
    pub fn new(op: GateOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> GateOp {
        self.op
    }
}

impl Primitive for LogicGate {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let high = |v: &f64| *v != 0.0;
        let out = match self.op {
            GateOp::And => inputs.iter().all(high),
            GateOp::Nand => !inputs.iter().all(high),
            GateOp::Or => inputs.iter().any(high),
            GateOp::Nor => !inputs.iter().any(high),
            GateOp::Xor => (inputs[0] != 0.0) != (inputs[1] != 0.0),
            GateOp::Xnor => (inputs[0] != 0.0) == (inputs[1] != 0.0),
        };
        outputs[0] = level(out);
    }
}

/// Inverter. Inputs: `in`.
#[derive(Debug, Clone, Default)]
pub struct LogicInverter;

impl Primitive for LogicInverter {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = level(inputs[0] == 0.0);
    }
}

// ============================================================================
// Flip-flops
// ============================================================================

/// D flip-flop clocked on the rising edge.
///
/// Inputs: `/reset, /set, clock, data`. Reset and set are active low and
/// override the clock, reset first.
#[derive(Debug, Clone, Default)]
pub struct DFlipFlop {
    last_clk: bool,
    q: f64,
}

impl Primitive for DFlipFlop {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        self.last_clk = false;
        self.q = 0.0;
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let clk = inputs[2].trunc() != 0.0;
        if inputs[0] == 0.0 {
            self.q = 0.0;
        } else if inputs[1] == 0.0 {
            self.q = 1.0;
        } else if !self.last_clk && clk {
            self.q = inputs[3];
        }
        self.last_clk = clk;
        outputs[0] = self.q;
    }
}

/// JK flip-flop clocked on the falling edge.
///
/// Inputs: `/reset, /set, clock, j, k`.
#[derive(Debug, Clone, Default)]
pub struct JkFlipFlop {
    last_clk: bool,
    q: bool,
}

impl Primitive for JkFlipFlop {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        self.last_clk = false;
        self.q = false;
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let clk = inputs[2].trunc() != 0.0;
        let j = inputs[3].trunc() != 0.0;
        let k = inputs[4].trunc() != 0.0;

        if inputs[0] == 0.0 {
            self.q = false;
        } else if inputs[1] == 0.0 {
            self.q = true;
        } else if self.last_clk && !clk {
            self.q = match (j, k) {
                (false, false) => self.q,
                (false, true) => false,
                (true, false) => true,
                (true, true) => !self.q,
            };
        }
        self.last_clk = clk;
        outputs[0] = level(self.q);
    }
}

// ============================================================================
// Shift register
// ============================================================================

/// Widest supported shift register.
pub const MAX_SHIFT_BITS: u32 = 32;

/// What the clock input of a shift register means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftClock {
    FallingEdge,
    RisingEdge,
    /// The clock input is the number of shifts this sample.
    ByCount,
    /// The clock input is a frequency in Hz; fractional cycles carry over.
    Frequency,
}

impl ShiftClock {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FALLING" | "F_EDGE" => Some(Self::FallingEdge),
            "RISING" | "R_EDGE" => Some(Self::RisingEdge),
            "COUNT" | "BY_COUNT" | "LEVEL" => Some(Self::ByCount),
            "FREQ" | "FREQUENCY" => Some(Self::Frequency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShiftConfig {
    pub size: u32,
    pub clock: ShiftClock,
    /// Shift toward the LSB, entering data at the MSB.
    pub shift_right: bool,
    pub reset_on_high: bool,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            size: 8,
            clock: ShiftClock::RisingEdge,
            shift_right: false,
            reset_on_high: false,
        }
    }
}

/// Shift register. Inputs: `in, reset, clock`.
#[derive(Debug, Clone)]
pub struct ShiftRegister {
    config: ShiftConfig,
    data: u64,
    mask: u64,
    last_clk: bool,
    /// Seconds into the current clock cycle (frequency mode).
    t_left: f64,
}

impl ShiftRegister {
    pub fn new(config: ShiftConfig) -> Self {
        Self {
            config,
            data: 0,
            mask: 0,
            last_clk: false,
            t_left: 0.0,
        }
    }
}

impl Primitive for ShiftRegister {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        let size = self.config.size;
        if size == 0 || size > MAX_SHIFT_BITS {
            return Err(DiscreteError::config(
                ctx.node(),
                format!("size must be 1 to {}, got {}", MAX_SHIFT_BITS, size),
            ));
        }
        self.mask = (1u64 << size) - 1;
        self.data = 0;
        self.last_clk = false;
        self.t_left = 0.0;
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let bit = (inputs[0] != 0.0) as u64;
        let clock = inputs[2];

        let mut shifts: u64 = 0;
        if self.config.clock == ShiftClock::Frequency {
            // The internal clock keeps running through reset
            if clock > 0.0 {
                let cycles = (self.t_left + ctx.sample_time()) * clock;
                let whole = cycles.trunc();
                self.t_left = (cycles - whole) / clock;
                shifts = whole as u64;
            } else {
                self.t_left = 0.0;
            }
        }

        if (inputs[1] != 0.0) == self.config.reset_on_high {
            self.data = 0;
            outputs[0] = 0.0;
            return;
        }

        match self.config.clock {
            ShiftClock::FallingEdge | ShiftClock::RisingEdge => {
                let clk = clock.trunc() != 0.0;
                if clk != self.last_clk {
                    self.last_clk = clk;
                    if clk == (self.config.clock == ShiftClock::RisingEdge) {
                        shifts = 1;
                    }
                }
            }
            ShiftClock::ByCount => {
                shifts = clock.trunc().max(0.0) as u64;
            }
            ShiftClock::Frequency => {}
        }

        // Anything past the register width has fully flushed the old data
        let size = self.config.size;
        for _ in 0..shifts.min(size as u64) {
            if self.config.shift_right {
                self.data = (self.data >> 1) | (bit << (size - 1));
            } else {
                self.data = ((self.data << 1) | bit) & self.mask;
            }
        }
        outputs[0] = self.data as f64;
    }
}

// ============================================================================
// Bit decoder
// ============================================================================

/// Largest decodable input value.
const BITS_DECODE_LIMIT: f64 = 4_294_967_296.0;

/// Splits bits `from..=to` of its input onto separate outputs.
///
/// Inputs: `in`. The fractional part of `in` is the X-time of the value
/// change. With `v_out == 0` each output is X-time logic (`bit + fraction`
/// on a changed bit); otherwise it is an energy voltage: `v_out` scaled by
/// the share of the sample spent high.
#[derive(Debug, Clone)]
pub struct BitsDecode {
    from: u32,
    to: u32,
    v_out: f64,
    last_val: u64,
    /// Bits whose last update carried X-time and must be settled.
    last_had_x_time: u64,
    out_of_range: FaultLatch,
}

impl BitsDecode {
    pub fn new(from: u32, to: u32, v_out: f64) -> Self {
        Self {
            from,
            to,
            v_out,
            last_val: 0,
            last_had_x_time: 0,
            out_of_range: FaultLatch::default(),
        }
    }

    /// Number of outputs.
    pub fn count(&self) -> usize {
        (self.to.saturating_sub(self.from) + 1) as usize
    }

    fn output(&self, bit: u64, changed: bool, x_time: f64) -> f64 {
        let bit_level = bit as f64;
        if self.v_out == 0.0 {
            if changed {
                bit_level + x_time
            } else {
                bit_level
            }
        } else if x_time > 0.0 && changed {
            // Share of the sample after the transition instant
            if bit == 1 {
                self.v_out * (1.0 - x_time)
            } else {
                self.v_out * x_time
            }
        } else {
            self.v_out * bit_level
        }
    }
}

impl Primitive for BitsDecode {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        if self.from > self.to || self.to >= 32 {
            return Err(DiscreteError::config(
                ctx.node(),
                format!("bit range {}..={} must be ascending within 0..=31", self.from, self.to),
            ));
        }
        let input = inputs[0];
        self.last_val = if (0.0..BITS_DECODE_LIMIT).contains(&input) {
            input as u64
        } else {
            0
        };
        self.last_had_x_time = 0;
        self.out_of_range = FaultLatch::default();
        for (i, out) in outputs.iter_mut().enumerate().take(self.count()) {
            let bit = (self.last_val >> (i as u32 + self.from)) & 1;
            *out = self.output(bit, false, 0.0);
        }
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let input = inputs[0];
        if !(0.0..BITS_DECODE_LIMIT).contains(&input) {
            self.out_of_range.trip(ctx, Fault::IndexOutOfRange, input);
            return;
        }
        self.out_of_range.clear();

        let new_val = input as u64;
        if new_val == self.last_val && self.last_had_x_time == 0 {
            return;
        }
        let x_time = input - new_val as f64;
        let has_x_time = x_time > 0.0;

        for i in 0..self.count() {
            let shift = i as u32 + self.from;
            let new_bit = (new_val >> shift) & 1;
            let last_bit = (self.last_val >> shift) & 1;
            let had_x_time = (self.last_had_x_time >> shift) & 1 != 0;
            let changed = new_bit != last_bit;
            if !changed && !had_x_time {
                continue;
            }

            outputs[i] = self.output(new_bit, changed, x_time);
            if has_x_time && changed {
                self.last_had_x_time |= 1 << shift;
            } else {
                self.last_had_x_time &= !(1 << shift);
            }
        }
        self.last_val = new_val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Diagnostics, SampleClock};
    use approx::assert_relative_eq;

    struct Bench {
        clock: SampleClock,
        diag: Diagnostics,
    }

    impl Bench {
        fn new(rate: f64) -> Self {
            Self {
                clock: SampleClock::new(rate).unwrap(),
                diag: Diagnostics::new(),
            }
        }

        fn reset<P: Primitive>(&mut self, p: &mut P, inputs: &[f64], outputs: &mut [f64]) -> Result<()> {
            let mut ctx = Context::new("L", &self.clock, &mut self.diag);
            p.reset(inputs, outputs, &mut ctx)
        }

        fn step<P: Primitive>(&mut self, p: &mut P, inputs: &[f64], outputs: &mut [f64]) {
            let mut ctx = Context::new("L", &self.clock, &mut self.diag);
            p.step(inputs, outputs, &mut ctx);
        }

        fn step1<P: Primitive>(&mut self, p: &mut P, inputs: &[f64]) -> f64 {
            let mut out = [0.0];
            self.step(p, inputs, &mut out);
            out[0]
        }
    }

    #[test]
    fn test_gates() {
        let mut b = Bench::new(1000.0);
        let mut and = LogicGate::new(GateOp::And);
        let mut nor = LogicGate::new(GateOp::Nor);
        let mut xnor = LogicGate::new(GateOp::Xnor);
        assert_eq!(b.step1(&mut and, &[1.0, 1.0, 2.5, 1.0]), 1.0);
        assert_eq!(b.step1(&mut and, &[1.0, 0.0, 1.0, 1.0]), 0.0);
        assert_eq!(b.step1(&mut nor, &[0.0, 0.0]), 1.0);
        assert_eq!(b.step1(&mut nor, &[0.0, 1.0]), 0.0);
        assert_eq!(b.step1(&mut xnor, &[1.0, 1.0]), 1.0);
        assert_eq!(b.step1(&mut xnor, &[1.0, 0.0]), 0.0);
        assert_eq!(b.step1(&mut LogicInverter, &[0.0]), 1.0);
        assert_eq!(b.step1(&mut LogicInverter, &[3.0]), 0.0);
    }

    #[test]
    fn test_dff_rising_edge_and_overrides() {
        let mut b = Bench::new(1000.0);
        let mut ff = DFlipFlop::default();
        b.reset(&mut ff, &[1.0, 1.0, 0.0, 0.0], &mut [0.0]).unwrap();
        // Data without an edge is ignored
        assert_eq!(b.step1(&mut ff, &[1.0, 1.0, 0.0, 1.0]), 0.0);
        assert_eq!(b.step1(&mut ff, &[1.0, 1.0, 1.0, 1.0]), 1.0);
        assert_eq!(b.step1(&mut ff, &[1.0, 1.0, 1.0, 0.0]), 1.0);
        // Active-low reset wins over set
        assert_eq!(b.step1(&mut ff, &[0.0, 0.0, 1.0, 1.0]), 0.0);
        assert_eq!(b.step1(&mut ff, &[1.0, 0.0, 0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_jkff_falling_edge() {
        let mut b = Bench::new(1000.0);
        let mut ff = JkFlipFlop::default();
        b.reset(&mut ff, &[1.0; 5], &mut [0.0]).unwrap();
        let clock = |b: &mut Bench, ff: &mut JkFlipFlop, j: f64, k: f64| {
            b.step1(ff, &[1.0, 1.0, 1.0, j, k]);
            b.step1(ff, &[1.0, 1.0, 0.0, j, k])
        };
        assert_eq!(clock(&mut b, &mut ff, 1.0, 0.0), 1.0);
        assert_eq!(clock(&mut b, &mut ff, 0.0, 0.0), 1.0);
        assert_eq!(clock(&mut b, &mut ff, 1.0, 1.0), 0.0);
        assert_eq!(clock(&mut b, &mut ff, 1.0, 1.0), 1.0);
        assert_eq!(clock(&mut b, &mut ff, 0.0, 1.0), 0.0);
        // Rising edge alone does nothing
        assert_eq!(b.step1(&mut ff, &[1.0, 1.0, 1.0, 1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_shift_left_four_bits() {
        let mut b = Bench::new(1000.0);
        let mut sr = ShiftRegister::new(ShiftConfig {
            size: 4,
            ..Default::default()
        });
        b.reset(&mut sr, &[0.0, 1.0, 0.0], &mut [0.0]).unwrap();
        let mut out = 0.0;
        for bit in [1.0, 0.0, 1.0, 1.0] {
            b.step1(&mut sr, &[bit, 1.0, 1.0]);
            out = b.step1(&mut sr, &[bit, 1.0, 0.0]);
        }
        assert_eq!(out, 0b1011 as f64);
        // Fifth bit pushes the oldest out of the 4-bit window
        b.step1(&mut sr, &[0.0, 1.0, 1.0]);
        assert_eq!(b.step1(&mut sr, &[0.0, 1.0, 0.0]), 0b0110 as f64);
        // Active-low reset clears
        assert_eq!(b.step1(&mut sr, &[1.0, 0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_shift_right_by_count() {
        let mut b = Bench::new(1000.0);
        let mut sr = ShiftRegister::new(ShiftConfig {
            size: 8,
            clock: ShiftClock::ByCount,
            shift_right: true,
            reset_on_high: true,
        });
        b.reset(&mut sr, &[0.0; 3], &mut [0.0]).unwrap();
        assert_eq!(b.step1(&mut sr, &[1.0, 0.0, 1.0]), 0x80 as f64);
        assert_eq!(b.step1(&mut sr, &[0.0, 0.0, 2.0]), 0x20 as f64);
        assert_eq!(b.step1(&mut sr, &[1.0, 0.0, 3.0]), 0xE4 as f64);
        assert_eq!(b.step1(&mut sr, &[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_shift_frequency_clock() {
        let mut b = Bench::new(1024.0);
        let mut sr = ShiftRegister::new(ShiftConfig {
            size: 16,
            clock: ShiftClock::Frequency,
            ..Default::default()
        });
        b.reset(&mut sr, &[0.0; 3], &mut [0.0]).unwrap();
        // 256 Hz at 1024 Hz: one shift every fourth sample
        let mut out = 0.0;
        for _ in 0..8 {
            out = b.step1(&mut sr, &[1.0, 1.0, 256.0]);
        }
        assert_eq!(out, 0b11 as f64);
    }

    #[test]
    fn test_bits_decode_x_time_logic() {
        let mut b = Bench::new(1000.0);
        let mut dec = BitsDecode::new(1, 2, 0.0);
        let mut out = [0.0; 2];
        b.reset(&mut dec, &[0.0], &mut out).unwrap();
        b.step(&mut dec, &[6.25], &mut out);
        assert_relative_eq!(out[0], 1.25);
        assert_relative_eq!(out[1], 1.25);
        // Settles on the next sample without a change
        b.step(&mut dec, &[6.0], &mut out);
        assert_eq!(out, [1.0, 1.0]);
        b.step(&mut dec, &[2.0], &mut out);
        assert_eq!(out, [1.0, 0.0]);
    }

    #[test]
    fn test_bits_decode_energy() {
        let mut b = Bench::new(1000.0);
        let mut dec = BitsDecode::new(0, 0, 5.0);
        let mut out = [0.0];
        b.reset(&mut dec, &[0.0], &mut out).unwrap();
        b.step(&mut dec, &[1.25], &mut out);
        assert_relative_eq!(out[0], 5.0 * 0.75);
        b.step(&mut dec, &[1.0], &mut out);
        assert_relative_eq!(out[0], 5.0);
        b.step(&mut dec, &[0.5], &mut out);
        assert_relative_eq!(out[0], 2.5);
    }

    #[test]
    fn test_bits_decode_bad_input() {
        let mut b = Bench::new(1000.0);
        let mut dec = BitsDecode::new(0, 1, 0.0);
        let mut out = [0.0; 2];
        b.reset(&mut dec, &[3.0], &mut out).unwrap();
        assert_eq!(out, [1.0, 1.0]);
        b.step(&mut dec, &[-1.0], &mut out);
        assert_eq!(out, [1.0, 1.0]);
        assert_eq!(b.diag.count(Fault::IndexOutOfRange), 1);
        assert!(BitsDecode::new(3, 1, 0.0)
            .reset(&[0.0], &mut out, &mut Context::new("L", &b.clock, &mut b.diag))
            .is_err());
    }
}
