//! Op-amp integrators.
//!
//! Three circuit types share one state voltage that is clipped every sample
//! to `[0, v_max_out]`:
//!
//! - [`IntegratorKind::OpAmpTrigger`]: a conventional op-amp whose capacitor
//!   is shorted to the rail while `trg0` is active and otherwise discharges
//!   at a constant rate set by `r1` and the `r2`/`r3` reference divider.
//! - [`IntegratorKind::Norton1`]: a Norton op-amp with a fixed discharge
//!   current through `r1` and a charge current from `trg0` through `r2`.
//! - [`IntegratorKind::Norton2`]: a Norton op-amp whose three current paths
//!   are switched by trigger functions `f0` (discharge), `f1` and `f2`.
//!
//! Inputs: `trg0, trg1`.

use crate::engine::Context;
use crate::error::{DiscreteError, Result};

use super::rc::{OP_AMP_NORTON_VBE, OP_AMP_VP_RAIL_OFFSET};
use super::trigger::TriggerFunction;
use super::Primitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    OpAmpTrigger,
    Norton1,
    Norton2,
}

impl IntegratorKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OP_AMP_1" | "OPAMP" | "TRIGGER" => Some(Self::OpAmpTrigger),
            "NORTON_1" | "NORTON1" => Some(Self::Norton1),
            "NORTON_2" | "NORTON2" => Some(Self::Norton2),
            _ => None,
        }
    }
}

/// Static component values of an integrator.
#[derive(Debug, Clone)]
pub struct IntegratorConfig {
    pub kind: IntegratorKind,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub c: f64,
    /// Charging supply.
    pub v1: f64,
    /// Op-amp positive supply.
    pub vp: f64,
    pub f0: TriggerFunction,
    pub f1: TriggerFunction,
    pub f2: TriggerFunction,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            kind: IntegratorKind::OpAmpTrigger,
            r1: 0.0,
            r2: 0.0,
            r3: 0.0,
            c: 0.0,
            v1: 5.0,
            vp: 12.0,
            f0: TriggerFunction::Trg0,
            f1: TriggerFunction::Trg1,
            f2: TriggerFunction::Trg0Inv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Integrator {
    config: IntegratorConfig,
    v_out: f64,
    v_max_out: f64,
    v_max_in: f64,
    v_max_in_d: f64,
    /// Linear discharge per sample (trigger type).
    change: f64,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self {
            config,
            v_out: 0.0,
            v_max_out: 0.0,
            v_max_in: 0.0,
            v_max_in_d: 0.0,
            change: 0.0,
        }
    }

    fn check(&self, node: &str) -> Result<()> {
        let c = &self.config;
        let needed: &[(&str, f64)] = match c.kind {
            IntegratorKind::OpAmpTrigger => &[("r1", c.r1), ("c", c.c)],
            IntegratorKind::Norton1 => &[("r1", c.r1), ("r2", c.r2), ("c", c.c)],
            IntegratorKind::Norton2 => &[("r1", c.r1), ("r2", c.r2), ("r3", c.r3), ("c", c.c)],
        };
        for (name, value) in needed {
            if *value <= 0.0 {
                return Err(DiscreteError::config(node, format!("{} must be positive", name)));
            }
        }
        if c.kind == IntegratorKind::OpAmpTrigger && c.r2 + c.r3 <= 0.0 {
            return Err(DiscreteError::config(node, "r2 + r3 must be positive"));
        }
        Ok(())
    }
}

impl Primitive for Integrator {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.check(ctx.node())?;
        let c = &self.config;
        match c.kind {
            IntegratorKind::OpAmpTrigger => {
                self.v_max_out = c.vp - OP_AMP_VP_RAIL_OFFSET;
                let v_ref = c.v1 * c.r3 / (c.r2 + c.r3);
                let i = (c.v1 - v_ref) / c.r1;
                self.change = i * ctx.sample_time() / c.c;
            }
            IntegratorKind::Norton1 | IntegratorKind::Norton2 => {
                self.v_max_out = c.vp - OP_AMP_NORTON_VBE;
                self.v_max_in = c.v1 - OP_AMP_NORTON_VBE;
                self.v_max_in_d = self.v_max_in - OP_AMP_NORTON_VBE;
            }
        }
        self.v_out = 0.0;
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let (trg0, trg1) = (inputs[0], inputs[1]);
        let c = &self.config;
        match c.kind {
            IntegratorKind::OpAmpTrigger => {
                if trg0 != 0.0 {
                    self.v_out = self.v_max_out;
                } else {
                    self.v_out -= self.change;
                }
            }
            IntegratorKind::Norton1 => {
                let i_neg = self.v_max_in / c.r1;
                let i_pos = ((trg0 - OP_AMP_NORTON_VBE) / c.r2).max(0.0);
                self.v_out += (i_pos - i_neg) * ctx.sample_time() / c.c;
            }
            IntegratorKind::Norton2 => {
                let i_neg = if c.f0.eval(trg0, trg1, 0.0) {
                    self.v_max_in_d / c.r1
                } else {
                    0.0
                };
                let mut i_pos = 0.0;
                if c.f1.eval(trg0, trg1, 0.0) {
                    i_pos += self.v_max_in / c.r2;
                }
                if c.f2.eval(trg0, trg1, 0.0) {
                    i_pos += self.v_max_in_d / c.r3;
                }
                self.v_out += (i_pos - i_neg) * ctx.sample_time() / c.c;
            }
        }

        self.v_out = self.v_out.clamp(0.0, self.v_max_out.max(0.0));
        outputs[0] = self.v_out;
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
        fn new() -> Self {
            Self {
                clock: SampleClock::new(10000.0).unwrap(),
                diag: Diagnostics::new(),
            }
        }

        fn reset(&mut self, p: &mut Integrator) {
            let mut out = [0.0];
            let mut ctx = Context::new("I", &self.clock, &mut self.diag);
            p.reset(&[0.0, 0.0], &mut out, &mut ctx).unwrap();
        }

        fn step(&mut self, p: &mut Integrator, trg0: f64, trg1: f64) -> f64 {
            let mut out = [0.0];
            let mut ctx = Context::new("I", &self.clock, &mut self.diag);
            p.step(&[trg0, trg1], &mut out, &mut ctx);
            out[0]
        }
    }

    #[test]
    fn test_trigger_type_snaps_and_discharges() {
        let mut bench = Bench::new();
        let mut int = Integrator::new(IntegratorConfig {
            kind: IntegratorKind::OpAmpTrigger,
            r1: 100e3,
            r2: 10e3,
            r3: 10e3,
            c: 1e-6,
            v1: 5.0,
            vp: 12.0,
            ..Default::default()
        });
        bench.reset(&mut int);

        assert_relative_eq!(bench.step(&mut int, 1.0, 0.0), 10.5);
        // (5 - 2.5) / 100k = 25uA, over 1uF at 10kHz = 2.5mV per sample
        assert_relative_eq!(bench.step(&mut int, 0.0, 0.0), 10.5 - 0.0025, epsilon = 1e-12);
        for _ in 0..10000 {
            bench.step(&mut int, 0.0, 0.0);
        }
        assert_eq!(bench.step(&mut int, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_norton1_charges_with_trigger() {
        let mut bench = Bench::new();
        let mut int = Integrator::new(IntegratorConfig {
            kind: IntegratorKind::Norton1,
            r1: 1e6,
            r2: 100e3,
            c: 1e-6,
            v1: 5.0,
            vp: 12.0,
            ..Default::default()
        });
        bench.reset(&mut int);

        // i_pos = 4.5/100k = 45uA, i_neg = 4.5/1M = 4.5uA
        let v = bench.step(&mut int, 5.0, 0.0);
        assert_relative_eq!(v, 40.5e-6 * 1e-4 / 1e-6, epsilon = 1e-12);
        // Trigger low: only discharge, clipped at 0
        for _ in 0..100 {
            bench.step(&mut int, 0.0, 0.0);
        }
        assert_eq!(bench.step(&mut int, 0.0, 0.0), 0.0);
        // Long charge clips at vP - VBE
        for _ in 0..100_000 {
            bench.step(&mut int, 5.0, 0.0);
        }
        assert_relative_eq!(bench.step(&mut int, 5.0, 0.0), 11.5);
    }

    #[test]
    fn test_norton2_trigger_paths() {
        let mut bench = Bench::new();
        let mut int = Integrator::new(IntegratorConfig {
            kind: IntegratorKind::Norton2,
            r1: 100e3,
            r2: 100e3,
            r3: 100e3,
            c: 1e-6,
            v1: 5.0,
            vp: 12.0,
            f0: TriggerFunction::Trg0,
            f1: TriggerFunction::Trg1,
            f2: TriggerFunction::Trg01And,
        });
        bench.reset(&mut int);

        // Only f1 active: charge with v_max_in = 4.5V through r2
        let v = bench.step(&mut int, 0.0, 1.0);
        assert_relative_eq!(v, 4.5 / 100e3 * 1e-4 / 1e-6, epsilon = 1e-12);
        // f0, f1 and f2 active: 4.5/r2 + 4.0/r3 - 4.0/r1
        let v2 = bench.step(&mut int, 1.0, 1.0);
        assert_relative_eq!(v2 - v, 4.5 / 100e3 * 1e-4 / 1e-6, epsilon = 1e-12);
        // A fractional trg0 is inactive, so only f1 charges
        let v3 = bench.step(&mut int, 0.5, 1.999);
        assert_relative_eq!(v3 - v2, 4.5 / 100e3 * 1e-4 / 1e-6, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_missing_capacitor() {
        let clock = SampleClock::new(10000.0).unwrap();
        let mut diag = Diagnostics::new();
        let mut ctx = Context::new("I", &clock, &mut diag);
        let mut int = Integrator::new(IntegratorConfig {
            kind: IntegratorKind::Norton1,
            r1: 1e6,
            r2: 100e3,
            ..Default::default()
        });
        assert!(int.reset(&[0.0, 0.0], &mut [0.0], &mut ctx).is_err());
    }
}
