//! Norton (current-differencing) op-amp circuits.
//!
//! All three models work in input currents: each input resistor feeds
//! `(v - VBE) / r` into its pin, clamped at 0 when the junction is reverse
//! biased, and the output moves according to the current difference.
//! Output swing tops out at `vP - VBE`.

use crate::engine::Context;
use crate::error::{DiscreteError, Result};

use super::rc::{norton_current, rc_step, res_2_parallel, res_voltage_divider, OP_AMP_NORTON_VBE};
use super::trigger::TriggerFunction;
use super::Primitive;

/// Forward drop of a small-signal diode, in volts.
const DIODE_DROP: f64 = 0.6;

// ============================================================================
// Norton op-amp stage
// ============================================================================

/// Component values of a Norton op-amp stage.
///
/// `r1` feeds input 0 into the inverting pin, `r2` feeds input 1 into the
/// non-inverting pin, `r3` is a fixed bias from `vP` into the inverting
/// pin, `r4` is feedback and `c` an integrating capacitor. Zero marks a
/// component that is not fitted (`r2` is required).
#[derive(Debug, Clone, Default)]
pub struct OpAmpConfig {
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub r4: f64,
    pub c: f64,
    pub vp: f64,
    pub vn: f64,
}

/// Norton op-amp stage. Inputs: `enable, in0, in1`.
#[derive(Debug, Clone)]
pub struct NortonOpAmp {
    config: OpAmpConfig,
    v_max: f64,
    v_cap: f64,
    i_fixed: f64,
    /// RC charge factor with `r4`, otherwise `fs * c` for linear charge.
    exponent: f64,
}

impl NortonOpAmp {
    pub fn new(config: OpAmpConfig) -> Self {
        Self {
            config,
            v_max: 0.0,
            v_cap: 0.0,
            i_fixed: 0.0,
            exponent: 0.0,
        }
    }
}

impl Primitive for NortonOpAmp {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        let c = &self.config;
        if c.r2 <= 0.0 {
            return Err(DiscreteError::config(ctx.node(), "r2 must be positive"));
        }
        self.v_max = c.vp - OP_AMP_NORTON_VBE;
        self.v_cap = 0.0;
        self.exponent = if c.c <= 0.0 {
            0.0
        } else if c.r4 > 0.0 {
            ctx.rc_charge_exp(c.r4 * c.c)
        } else {
            ctx.sample_rate() * c.c
        };
        self.i_fixed = if c.r3 > 0.0 {
            (c.vp - OP_AMP_NORTON_VBE) / c.r3
        } else {
            0.0
        };
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        if inputs[0] == 0.0 {
            outputs[0] = 0.0;
            return;
        }
        let c = &self.config;

        let mut i_neg = if c.r1 > 0.0 {
            norton_current(inputs[1], c.r1)
        } else {
            0.0
        };
        i_neg += self.i_fixed;
        let i_pos = norton_current(inputs[2], c.r2);
        let i = i_pos - i_neg;

        let v_out = if c.c > 0.0 {
            if c.r4 > 0.0 {
                rc_step(&mut self.v_cap, i * c.r4, self.exponent);
            } else {
                self.v_cap += i / self.exponent;
            }
            self.v_cap
        } else if c.r4 > 0.0 {
            i * c.r4
        } else if i > 0.0 {
            self.v_max
        } else {
            0.0
        };

        let v_out = if v_out > self.v_max {
            self.v_max
        } else if v_out < c.vn {
            c.vn
        } else {
            v_out
        };
        self.v_cap = v_out;
        outputs[0] = v_out;
    }
}

// ============================================================================
// Op-amp one-shot
// ============================================================================

/// Component values of a Norton op-amp one-shot.
///
/// The trigger couples through `c2`/`r2` into the non-inverting pin, `r5`
/// latches the output back into it, and `c1` charges through `r3 || r4`
/// (and discharges through `r4`, or at once through the clamp diode) to
/// end the pulse. `r1` biases the inverting pin from `vP`.
#[derive(Debug, Clone, Default)]
pub struct OneShotOpAmpConfig {
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub r4: f64,
    pub r5: f64,
    pub c1: f64,
    pub c2: f64,
    pub vp: f64,
    pub vn: f64,
}

/// Op-amp one-shot. Inputs: `trigger`.
#[derive(Debug, Clone)]
pub struct OpAmpOneShot {
    config: OneShotOpAmpConfig,
    exponent1c: f64,
    exponent1d: f64,
    exponent2: f64,
    i_fixed: f64,
    r34_ratio: f64,
    v_max: f64,
    v_cap1: f64,
    v_cap2: f64,
    v_out: f64,
}

impl OpAmpOneShot {
    pub fn new(config: OneShotOpAmpConfig) -> Self {
        Self {
            config,
            exponent1c: 0.0,
            exponent1d: 0.0,
            exponent2: 0.0,
            i_fixed: 0.0,
            r34_ratio: 0.0,
            v_max: 0.0,
            v_cap1: 0.0,
            v_cap2: 0.0,
            v_out: 0.0,
        }
    }
}

impl Primitive for OpAmpOneShot {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        let c = &self.config;
        for (name, value) in [("r1", c.r1), ("r2", c.r2), ("r3", c.r3), ("r4", c.r4), ("r5", c.r5)] {
            if value <= 0.0 {
                return Err(DiscreteError::config(ctx.node(), format!("{} must be positive", name)));
            }
        }
        self.exponent1c = ctx.rc_charge_exp(res_2_parallel(c.r3, c.r4) * c.c1);
        self.exponent1d = ctx.rc_charge_exp(c.r4 * c.c1);
        self.exponent2 = ctx.rc_charge_exp(c.r2 * c.c2);
        self.i_fixed = (c.vp - OP_AMP_NORTON_VBE) / c.r1;
        self.v_max = c.vp - OP_AMP_NORTON_VBE;
        self.r34_ratio = c.r3 / (c.r3 + c.r4);
        self.v_cap1 = 0.0;
        self.v_cap2 = 0.0;
        self.v_out = c.vn;
        outputs[0] = self.v_out;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let trigger = inputs[0];
        let c = &self.config;

        let i_pos = (trigger - self.v_cap2) / c.r2 + self.v_out / c.r5;
        rc_step(&mut self.v_cap2, trigger, self.exponent2);

        let i_neg = norton_current(self.v_cap1, c.r3) + self.i_fixed;
        self.v_out = if i_pos > i_neg { self.v_max } else { c.vn };

        // c1 discharges through the clamp diode, then r4; charges via r3 || r4
        let v_diode = self.v_out + DIODE_DROP;
        if self.v_cap1 > self.v_out {
            if self.v_cap1 > v_diode {
                self.v_cap1 = v_diode;
            } else {
                rc_step(&mut self.v_cap1, self.v_out, self.exponent1d);
            }
        } else {
            let target =
                (self.v_out - OP_AMP_NORTON_VBE) * self.r34_ratio + OP_AMP_NORTON_VBE;
            rc_step(&mut self.v_cap1, target, self.exponent1c);
        }

        outputs[0] = self.v_out;
    }
}

// ============================================================================
// Triggered VCA
// ============================================================================

/// Component values of a triggered op-amp VCA.
///
/// - `r1`: fixed bias from `vP` into the inverting pin
/// - `r2`, `r3`: audio inputs 0/1 into the inverting pin, gated by `f0`/`f1`
/// - `r4`, `c4`: output load and optional output capacitor
/// - `r5`..`r7`, `c1`, `v1`: main trigger charge circuit, gated by `f2`,
///   with `f3` selecting whether `r7` is in circuit
/// - `r8`, `r9`, `c2`, `v2`: second charge circuit, gated by `f4`
/// - `r10`, `r11`, `c3`, `v3`: third charge circuit, gated by `f5`
#[derive(Debug, Clone)]
pub struct TvcaConfig {
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub r4: f64,
    pub r5: f64,
    pub r6: f64,
    pub r7: f64,
    pub r8: f64,
    pub r9: f64,
    pub r10: f64,
    pub r11: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub vp: f64,
    pub f0: TriggerFunction,
    pub f1: TriggerFunction,
    pub f2: TriggerFunction,
    pub f3: TriggerFunction,
    pub f4: TriggerFunction,
    pub f5: TriggerFunction,
}

impl Default for TvcaConfig {
    fn default() -> Self {
        Self {
            r1: 0.0,
            r2: 0.0,
            r3: 0.0,
            r4: 0.0,
            r5: 0.0,
            r6: 0.0,
            r7: 0.0,
            r8: 0.0,
            r9: 0.0,
            r10: 0.0,
            r11: 0.0,
            c1: 0.0,
            c2: 0.0,
            c3: 0.0,
            c4: 0.0,
            v1: 5.0,
            v2: 5.0,
            v3: 5.0,
            vp: 12.0,
            f0: TriggerFunction::Trg0Inv,
            f1: TriggerFunction::Trg1Inv,
            f2: TriggerFunction::Trg0,
            f3: TriggerFunction::Trg2Inv,
            f4: TriggerFunction::Trg1,
            f5: TriggerFunction::Trg2,
        }
    }
}

/// Capacitor charged toward a trigger voltage through a divider.
#[derive(Debug, Clone, Copy, Default)]
struct ChargeCircuit {
    v_cap: f64,
    v_trig: f64,
    /// Charge factor indexed by the gating trigger function result.
    exponent: [f64; 2],
}

impl ChargeCircuit {
    fn setup(r_top: f64, r_bottom: f64, c: f64, v: f64, ctx: &Context<'_>) -> Self {
        let v_trig = if r_top + r_bottom > 0.0 {
            (v - DIODE_DROP - OP_AMP_NORTON_VBE) * res_voltage_divider(r_top, r_bottom)
        } else {
            0.0
        };
        Self {
            v_cap: 0.0,
            v_trig,
            exponent: [
                ctx.rc_charge_exp(r_bottom * c),
                ctx.rc_charge_exp(res_2_parallel(r_top, r_bottom) * c),
            ],
        }
    }

    fn step(&mut self, active: bool) -> f64 {
        let target = if active { self.v_trig } else { 0.0 };
        rc_step(&mut self.v_cap, target, self.exponent[active as usize]);
        self.v_cap
    }
}

/// Triggered op-amp VCA. Inputs: `trg0, trg1, trg2, in0, in1`.
#[derive(Debug, Clone)]
pub struct TriggeredVca {
    config: TvcaConfig,
    r67: f64,
    v_out_max: f64,
    i_fixed: f64,
    v_cap1: f64,
    /// Target of c1, indexed by the `f3` result.
    v_trig: [f64; 2],
    exponent_c: [f64; 2],
    exponent_d: [f64; 2],
    cap2: ChargeCircuit,
    cap3: ChargeCircuit,
    v_cap4: f64,
    exponent4: f64,
}

impl TriggeredVca {
    pub fn new(config: TvcaConfig) -> Self {
        Self {
            config,
            r67: 0.0,
            v_out_max: 0.0,
            i_fixed: 0.0,
            v_cap1: 0.0,
            v_trig: [0.0; 2],
            exponent_c: [0.0; 2],
            exponent_d: [0.0; 2],
            cap2: ChargeCircuit::default(),
            cap3: ChargeCircuit::default(),
            v_cap4: 0.0,
            exponent4: 0.0,
        }
    }
}

impl Primitive for TriggeredVca {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        let c = &self.config;
        if c.r1 <= 0.0 {
            return Err(DiscreteError::config(ctx.node(), "r1 must be positive"));
        }
        if c.r6 + c.r7 <= 0.0 {
            return Err(DiscreteError::config(ctx.node(), "r6 + r7 must be positive"));
        }
        if c.c4 == 0.0 && c.r4 == 0.0 {
            return Err(DiscreteError::config(ctx.node(), "needs r4, c4 or both"));
        }

        self.r67 = c.r6 + c.r7;
        self.v_out_max = c.vp - OP_AMP_NORTON_VBE;
        self.i_fixed = self.v_out_max / c.r1;

        self.v_trig[0] = (c.v1 - DIODE_DROP) * res_voltage_divider(c.r5, c.r6);
        self.v_trig[1] = (c.v1 - DIODE_DROP - OP_AMP_NORTON_VBE)
            * res_voltage_divider(c.r5, self.r67)
            + OP_AMP_NORTON_VBE;
        self.exponent_c[0] = ctx.rc_charge_exp(res_2_parallel(c.r5, c.r6) * c.c1);
        self.exponent_c[1] = ctx.rc_charge_exp(res_2_parallel(c.r5, self.r67) * c.c1);
        // With r6 absent, f3 grounding leaves c1 with no discharge path
        self.exponent_d[0] = if c.r6 != 0.0 {
            ctx.rc_charge_exp(c.r6 * c.c1)
        } else {
            0.0
        };
        self.exponent_d[1] = ctx.rc_charge_exp(self.r67 * c.c1);
        self.v_cap1 = 0.0;

        self.cap2 = ChargeCircuit::setup(c.r8, c.r9, c.c2, c.v2, ctx);
        self.cap3 = ChargeCircuit::setup(c.r10, c.r11, c.c3, c.v3, ctx);

        self.v_cap4 = 0.0;
        self.exponent4 = if c.c4 == 0.0 {
            0.0
        } else if c.r4 != 0.0 {
            ctx.rc_charge_exp(c.r4 * c.c4)
        } else {
            ctx.sample_rate() * c.c4
        };

        self.step(inputs, outputs, ctx);
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) {
        let (trg0, trg1, trg2) = (inputs[0], inputs[1], inputs[2]);
        let c = &self.config;
        let tf = |f: TriggerFunction| f.eval(trg0, trg1, trg2);
        let f3 = tf(c.f3);

        let i2 = if c.r2 != 0.0 && tf(c.f0) {
            norton_current(inputs[3], c.r2)
        } else {
            0.0
        };
        let i3 = if c.r3 != 0.0 && tf(c.f1) {
            norton_current(inputs[4], c.r3)
        } else {
            0.0
        };
        let i_neg = self.i_fixed + i2 + i3;

        let sel = f3 as usize;
        if tf(c.f2) {
            rc_step(&mut self.v_cap1, self.v_trig[sel], self.exponent_c[sel]);
        } else {
            // Diode blocks the r5 path; c1 drains through r6 (+ r7)
            let target = if f3 { OP_AMP_NORTON_VBE } else { 0.0 };
            rc_step(&mut self.v_cap1, target, self.exponent_d[sel]);
        }

        let mut i_pos = (self.v_cap1 - OP_AMP_NORTON_VBE) / self.r67;
        if i_pos < 0.0 || !f3 {
            i_pos = 0.0;
        }
        if c.r9 != 0.0 {
            i_pos += self.cap2.step(tf(c.f4)) / c.r9;
        }
        if c.r11 != 0.0 {
            i_pos += self.cap3.step(tf(c.f5)) / c.r11;
        }

        let i_out = (i_pos - i_neg).max(0.0);

        let mut v_out = if c.c4 != 0.0 {
            if c.r4 != 0.0 {
                rc_step(&mut self.v_cap4, i_out * c.r4, self.exponent4);
            } else {
                self.v_cap4 += i_out / self.exponent4;
            }
            self.v_cap4 = self.v_cap4.max(0.0);
            self.v_cap4
        } else {
            i_out * c.r4
        };
        if v_out > self.v_out_max {
            v_out = self.v_out_max;
        }
        outputs[0] = v_out;
    }
}
