//! Resistor-ladder DAC and parallel-component adder.
//!
//! Both precompute every code's output at reset with the table builder and
//! only index at step time.

use crate::engine::{Context, Fault, FaultLatch};
use crate::error::{DiscreteError, Result};

use super::table::{ladder_levels, parallel_totals, ParallelKind, DISC_LADDER_MAXRES};
use super::Primitive;

/// Settling threshold of the DAC output filter, in volts.
const FILTER_SNAP: f64 = 1e-6;

/// Component values of a single-ladder DAC.
#[derive(Debug, Clone)]
pub struct DacR1Config {
    /// Per-bit resistor, LSB first; 0 marks an unwired bit.
    pub r: Vec<f64>,
    /// Logic-high voltage driving a set bit.
    pub v_on: f64,
    pub r_bias: f64,
    pub v_bias: f64,
    pub r_gnd: f64,
    /// Smoothing capacitor across the output; 0 for none.
    pub c_filter: f64,
}

impl Default for DacR1Config {
    fn default() -> Self {
        Self {
            r: Vec::new(),
            v_on: 5.0,
            r_bias: 0.0,
            v_bias: 0.0,
            r_gnd: 0.0,
            c_filter: 0.0,
        }
    }
}

/// Resistor-ladder DAC. Inputs: `data`.
///
/// The integer part of `data` selects the code. A fractional part is the
/// X-time of the code change: the output averages the previous level over
/// the part of the sample before the change and the new level after it.
#[derive(Debug, Clone)]
pub struct DacR1 {
    config: DacR1Config,
    levels: Vec<f64>,
    exponent: f64,
    last_v: f64,
    v_out: f64,
    out_of_range: FaultLatch,
}

impl DacR1 {
    pub fn new(config: DacR1Config) -> Self {
        Self {
            config,
            levels: Vec::new(),
            exponent: 0.0,
            last_v: 0.0,
            v_out: 0.0,
            out_of_range: FaultLatch::default(),
        }
    }
}

impl Primitive for DacR1 {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        let c = &self.config;
        if c.r.is_empty() || c.r.len() > DISC_LADDER_MAXRES {
            return Err(DiscreteError::config(
                ctx.node(),
                format!("ladder needs 1 to {} resistors, got {}", DISC_LADDER_MAXRES, c.r.len()),
            ));
        }
        if c.r.iter().chain([c.r_bias, c.r_gnd].iter()).any(|&r| r < 0.0) {
            return Err(DiscreteError::config(ctx.node(), "resistor values must not be negative"));
        }

        let table = ladder_levels(&c.r, c.v_on, c.r_bias, c.v_bias, c.r_gnd);
        self.exponent = if c.c_filter > 0.0 {
            ctx.rc_charge_exp(table.r_total * c.c_filter)
        } else {
            0.0
        };
        self.levels = table.levels;
        self.last_v = self.levels[0];
        self.v_out = self.levels[0];
        self.out_of_range = FaultLatch::default();
        outputs[0] = self.v_out;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let input = inputs[0];
        let code = input.trunc();
        let x_time = input - code;
        let max = (self.levels.len() - 1) as f64;

        let index = if code < 0.0 || code > max || code.is_nan() {
            self.out_of_range.trip(ctx, Fault::IndexOutOfRange, input);
            code.clamp(0.0, max)
        } else {
            self.out_of_range.clear();
            code
        };

        let v = self.levels[index as usize];
        let mut v_target = v;
        if x_time > 0.0 {
            v_target = self.last_v * x_time + v * (1.0 - x_time);
        }
        self.last_v = v;

        if self.config.c_filter > 0.0 {
            let diff = v_target - self.v_out;
            if diff.abs() < FILTER_SNAP {
                self.v_out = v_target;
            } else {
                self.v_out += diff * self.exponent;
            }
        } else {
            self.v_out = v_target;
        }
        outputs[0] = self.v_out;
    }
}

/// Parallel-component adder. Inputs: `select`.
///
/// Outputs the total of `default` with the components whose bits are set in
/// the selector.
#[derive(Debug, Clone)]
pub struct CompAdder {
    kind: ParallelKind,
    default: f64,
    values: Vec<f64>,
    totals: Vec<f64>,
    out_of_range: FaultLatch,
}

impl CompAdder {
    pub fn new(kind: ParallelKind, default: f64, values: Vec<f64>) -> Self {
        Self {
            kind,
            default,
            values,
            totals: Vec::new(),
            out_of_range: FaultLatch::default(),
        }
    }
}

impl Primitive for CompAdder {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        if self.values.is_empty() || self.values.len() > DISC_LADDER_MAXRES {
            return Err(DiscreteError::config(
                ctx.node(),
                format!("needs 1 to {} components, got {}", DISC_LADDER_MAXRES, self.values.len()),
            ));
        }
        self.totals = parallel_totals(self.kind, self.default, &self.values);
        self.out_of_range = FaultLatch::default();
        outputs[0] = self.totals[0];
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let select = inputs[0].trunc();
        if select >= 0.0 && select < self.totals.len() as f64 {
            self.out_of_range.clear();
            outputs[0] = self.totals[select as usize];
        } else {
            // Only the wired bits select anything
            self.out_of_range.trip(ctx, Fault::IndexOutOfRange, inputs[0]);
            let mask = self.totals.len() - 1;
            outputs[0] = self.totals[(select.max(0.0) as usize) & mask];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Diagnostics, SampleClock};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    struct Bench {
        clock: SampleClock,
        diag: Diagnostics,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                clock: SampleClock::new(48000.0).unwrap(),
                diag: Diagnostics::new(),
            }
        }

        fn reset<P: Primitive>(&mut self, p: &mut P) -> Result<f64> {
            let mut out = [0.0];
            let mut ctx = Context::new("DAC", &self.clock, &mut self.diag);
            p.reset(&[0.0], &mut out, &mut ctx)?;
            Ok(out[0])
        }

        fn step<P: Primitive>(&mut self, p: &mut P, input: f64) -> f64 {
            let mut out = [0.0];
            let mut ctx = Context::new("DAC", &self.clock, &mut self.diag);
            p.step(&[input], &mut out, &mut ctx);
            out[0]
        }
    }

    fn dac(c_filter: f64) -> DacR1 {
        DacR1::new(DacR1Config {
            r: vec![40e3, 20e3, 10e3],
            v_on: 5.0,
            r_gnd: 10e3,
            c_filter,
            ..Default::default()
        })
    }

    #[test]
    fn test_dac_monotonic_codes() {
        let mut bench = Bench::new();
        let mut d = dac(0.0);
        bench.reset(&mut d).unwrap();
        let mut last = -1.0;
        for code in 0..8 {
            let v = bench.step(&mut d, code as f64);
            assert!(v > last);
            last = v;
        }
    }

    #[test]
    fn test_dac_x_time_blend() {
        let mut bench = Bench::new();
        let mut d = dac(0.0);
        bench.reset(&mut d).unwrap();
        let low = bench.step(&mut d, 2.0);
        let high = bench.step(&mut d, 6.0);
        bench.step(&mut d, 2.0);

        // Change to code 6 a quarter of the way into the sample
        let blended = bench.step(&mut d, 6.25);
        assert_relative_eq!(blended, low * 0.25 + high * 0.75, epsilon = 1e-12);
        // Next whole sample sits at the new level
        assert_relative_eq!(bench.step(&mut d, 6.0), high);
    }

    #[test]
    fn test_dac_filter_converges() {
        let mut bench = Bench::new();
        let mut d = dac(0.1e-6);
        bench.reset(&mut d).unwrap();
        let mut v = 0.0;
        for _ in 0..48000 {
            v = bench.step(&mut d, 7.0);
        }
        let mut plain = dac(0.0);
        bench.reset(&mut plain).unwrap();
        assert_abs_diff_eq!(v, bench.step(&mut plain, 7.0), epsilon = 1e-6);
    }

    #[test]
    fn test_dac_bad_ladder() {
        let mut bench = Bench::new();
        let mut d = DacR1::new(DacR1Config {
            r: vec![1e3; 9],
            ..Default::default()
        });
        assert!(bench.reset(&mut d).is_err());
    }

    #[test]
    fn test_dac_code_out_of_range() {
        let mut bench = Bench::new();
        let mut d = dac(0.0);
        bench.reset(&mut d).unwrap();
        let top = bench.step(&mut d, 7.0);
        assert_relative_eq!(bench.step(&mut d, 12.0), top);
        assert_eq!(bench.diag.count(Fault::IndexOutOfRange), 1);
    }

    #[test]
    fn test_comp_adder_capacitors() {
        let mut bench = Bench::new();
        let mut adder = CompAdder::new(ParallelKind::Capacitor, 0.01e-6, vec![0.01e-6, 0.02e-6, 0.04e-6]);
        assert_relative_eq!(bench.reset(&mut adder).unwrap(), 0.01e-6);
        assert_relative_eq!(bench.step(&mut adder, 5.0), 0.06e-6, epsilon = 1e-18);
        assert_relative_eq!(bench.step(&mut adder, 7.0), 0.08e-6, epsilon = 1e-18);
    }

    #[test]
    fn test_comp_adder_resistors() {
        let mut bench = Bench::new();
        let mut adder = CompAdder::new(ParallelKind::Resistor, 10e3, vec![10e3, 5e3]);
        bench.reset(&mut adder).unwrap();
        assert_relative_eq!(bench.step(&mut adder, 0.0), 10e3);
        assert_relative_eq!(bench.step(&mut adder, 1.0), 5e3, epsilon = 1e-9);
        assert_relative_eq!(bench.step(&mut adder, 3.0), 2.5e3, epsilon = 1e-9);
    }
}
