//! Sample-and-hold and switching primitives.

use crate::engine::{Context, Fault, FaultLatch};
use crate::error::Result;

use super::Primitive;

/// When a sample-and-hold takes its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleHoldMode {
    /// Samples on every sample the clock rises.
    RisingEdge,
    /// Samples on every sample the clock falls.
    FallingEdge,
    /// Follows the input while the clock is non-zero.
    HighLatch,
    /// Follows the input while the clock is zero.
    LowLatch,
}

impl SampleHoldMode {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RISING" | "R_EDGE" => Some(Self::RisingEdge),
            "FALLING" | "F_EDGE" => Some(Self::FallingEdge),
            "HIGH" | "H_LATCH" => Some(Self::HighLatch),
            "LOW" | "L_LATCH" => Some(Self::LowLatch),
            _ => None,
        }
    }
}

/// Sample-and-hold. Inputs: `in, clock`.
#[derive(Debug, Clone)]
pub struct SampleHold {
    mode: SampleHoldMode,
    last_clock: f64,
    held: f64,
}

impl SampleHold {
    pub fn new(mode: SampleHoldMode) -> Self {
        Self {
            mode,
            last_clock: -1.0,
            held: 0.0,
        }
    }
}

impl Primitive for SampleHold {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        // -1 lets a rising-edge hold take its first sample at power-up
        self.last_clock = -1.0;
        self.held = 0.0;
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let (input, clock) = (inputs[0], inputs[1]);
        let take = match self.mode {
            SampleHoldMode::RisingEdge => clock > self.last_clock,
            SampleHoldMode::FallingEdge => clock < self.last_clock,
            SampleHoldMode::HighLatch => clock != 0.0,
            SampleHoldMode::LowLatch => clock == 0.0,
        };
        if take {
            self.held = input;
        }
        self.last_clock = clock;
        outputs[0] = self.held;
    }
}

/// Enable-gated 2-to-1 switch. Inputs: `enable, switch, in0, in1`.
#[derive(Debug, Clone, Default)]
pub struct Switch;

impl Primitive for Switch {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = if inputs[0] == 0.0 {
            0.0
        } else if inputs[1] != 0.0 {
            inputs[3]
        } else {
            inputs[2]
        };
    }
}

/// Analog switch. Inputs: `control, in, threshold`.
///
/// Passes `in` while `control` is above `threshold`, otherwise 0.
#[derive(Debug, Clone, Default)]
pub struct AnalogSwitch;

impl Primitive for AnalogSwitch {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        outputs[0] = if inputs[0] > inputs[2] { inputs[1] } else { 0.0 };
    }
}

/// 1-of-N selector. Inputs: `address, in0 .. inN-1`.
///
/// An address outside `0..N` keeps the previous output.
#[derive(Debug, Clone, Default)]
pub struct Multiplex {
    out: f64,
    bad_address: FaultLatch,
}

impl Primitive for Multiplex {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.out = 0.0;
        self.bad_address = FaultLatch::default();
        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let address = inputs[0].trunc();
        let count = (inputs.len() - 1) as f64;
        if address >= 0.0 && address < count {
            self.bad_address.clear();
            self.out = inputs[1 + address as usize];
        } else {
            self.bad_address.trip(ctx, Fault::IndexOutOfRange, inputs[0]);
        }
        outputs[0] = self.out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Diagnostics, SampleClock};

    fn run<P: Primitive>(p: &mut P, inputs: &[f64], diag: &mut Diagnostics) -> f64 {
        let clock = SampleClock::new(1000.0).unwrap();
        let mut ctx = Context::new("S", &clock, diag);
        let mut out = [0.0];
        p.step(inputs, &mut out, &mut ctx);
        out[0]
    }

    #[test]
    fn test_sample_hold_rising_edge() {
        let mut diag = Diagnostics::new();
        let mut sh = SampleHold::new(SampleHoldMode::RisingEdge);
        assert_eq!(run(&mut sh, &[3.0, 0.0], &mut diag), 3.0);
        assert_eq!(run(&mut sh, &[4.0, 0.0], &mut diag), 3.0);
        assert_eq!(run(&mut sh, &[5.0, 1.0], &mut diag), 5.0);
        assert_eq!(run(&mut sh, &[6.0, 1.0], &mut diag), 5.0);
        assert_eq!(run(&mut sh, &[7.0, 2.0], &mut diag), 7.0);
    }

    #[test]
    fn test_sample_hold_latches() {
        let mut diag = Diagnostics::new();
        let mut low = SampleHold::new(SampleHoldMode::LowLatch);
        assert_eq!(run(&mut low, &[1.0, 0.0], &mut diag), 1.0);
        assert_eq!(run(&mut low, &[2.0, 0.0], &mut diag), 2.0);
        assert_eq!(run(&mut low, &[3.0, 1.0], &mut diag), 2.0);

        let mut fall = SampleHold::new(SampleHoldMode::FallingEdge);
        run(&mut fall, &[1.0, 1.0], &mut diag);
        assert_eq!(run(&mut fall, &[2.0, 0.0], &mut diag), 2.0);
        assert_eq!(run(&mut fall, &[3.0, 0.0], &mut diag), 2.0);
    }

    #[test]
    fn test_switches() {
        let mut diag = Diagnostics::new();
        assert_eq!(run(&mut Switch, &[1.0, 0.0, 2.0, 3.0], &mut diag), 2.0);
        assert_eq!(run(&mut Switch, &[1.0, 1.0, 2.0, 3.0], &mut diag), 3.0);
        assert_eq!(run(&mut Switch, &[0.0, 1.0, 2.0, 3.0], &mut diag), 0.0);
        assert_eq!(run(&mut AnalogSwitch, &[2.6, 4.0, 2.5], &mut diag), 4.0);
        assert_eq!(run(&mut AnalogSwitch, &[2.5, 4.0, 2.5], &mut diag), 0.0);
    }

    #[test]
    fn test_multiplex_bad_address_holds() {
        let mut diag = Diagnostics::new();
        let mut mux = Multiplex::default();
        assert_eq!(run(&mut mux, &[2.0, 10.0, 20.0, 30.0], &mut diag), 30.0);
        assert_eq!(run(&mut mux, &[3.0, 10.0, 20.0, 30.0], &mut diag), 30.0);
        assert_eq!(run(&mut mux, &[-1.0, 10.0, 20.0, 30.0], &mut diag), 30.0);
        assert_eq!(diag.count(Fault::IndexOutOfRange), 1);
        assert_eq!(run(&mut mux, &[0.0, 10.0, 20.0, 30.0], &mut diag), 10.0);
    }
}
