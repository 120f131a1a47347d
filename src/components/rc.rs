//! Small circuit-math helpers shared by the analog modules.

/// Junction drop of a Norton (current-differencing) op-amp input, in volts.
pub const OP_AMP_NORTON_VBE: f64 = 0.5;

/// Headroom between a conventional op-amp's output swing and its positive
/// supply, in volts.
pub const OP_AMP_VP_RAIL_OFFSET: f64 = 1.5;

/// Two resistors in parallel. Zero means "not present", so the other
/// resistor is returned unchanged.
pub fn res_2_parallel(r1: f64, r2: f64) -> f64 {
    if r1 == 0.0 {
        return r2;
    }
    if r2 == 0.0 {
        return r1;
    }
    r1 * r2 / (r1 + r2)
}

/// Gain of a divider with `r_top` to the source and `r_bottom` to ground.
pub fn res_voltage_divider(r_top: f64, r_bottom: f64) -> f64 {
    r_bottom / (r_top + r_bottom)
}

/// One exponential step of a single-pole RC node toward `target`.
#[inline]
pub fn rc_step(v: &mut f64, target: f64, exp: f64) {
    *v += (target - *v) * exp;
}

/// Current through a Norton op-amp input resistor; zero when reverse biased.
#[inline]
pub fn norton_current(v_in: f64, r: f64) -> f64 {
    ((v_in - OP_AMP_NORTON_VBE) / r).max(0.0)
}
