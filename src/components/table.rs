//! Precomputed level tables.
//!
//! Built once at reset and indexed by code at step time, so the per-sample
//! path never repeats the Millman sums.

use tracing::debug;

/// Maximum number of selectable bits in a ladder or parallel adder.
pub const DISC_LADDER_MAXRES: usize = 8;

/// Output of [`ladder_levels`].
#[derive(Debug, Clone, PartialEq)]
pub struct LadderTable {
    /// Open-circuit output voltage for every input code.
    pub levels: Vec<f64>,
    /// Thevenin resistance seen at the output (all wired resistors in
    /// parallel, independent of the code).
    pub r_total: f64,
}

/// Millman voltages of a resistor-ladder DAC for all `2^r.len()` codes.
///
/// Bit `n` drives resistor `r[n]` to `v_on` when set and to ground when
/// clear; `0.0` marks an unwired bit. `r_bias` (to `v_bias`) and `r_gnd`
/// (to ground) are optional and also `0.0` when absent.
pub fn ladder_levels(r: &[f64], v_on: f64, r_bias: f64, v_bias: f64, r_gnd: f64) -> LadderTable {
    let mut conductance = 0.0;
    for &res in r.iter().filter(|&&res| res > 0.0) {
        conductance += 1.0 / res;
    }
    let i_bias = if r_bias > 0.0 {
        conductance += 1.0 / r_bias;
        v_bias / r_bias
    } else {
        0.0
    };
    if r_gnd > 0.0 {
        conductance += 1.0 / r_gnd;
    }
    let r_total = if conductance > 0.0 { 1.0 / conductance } else { 0.0 };

    let levels: Vec<f64> = (0..1usize << r.len())
        .map(|code| {
            let mut i = i_bias;
            for (bit, &res) in r.iter().enumerate() {
                if res > 0.0 && code & (1 << bit) != 0 {
                    i += v_on / res;
                }
            }
            i * r_total
        })
        .collect();

    debug!(codes = levels.len(), r_total, "built ladder table");
    LadderTable { levels, r_total }
}

/// How selected components combine in [`parallel_totals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelKind {
    /// Selected resistors are placed in parallel with the default.
    Resistor,
    /// Selected capacitors are placed in parallel with the default.
    Capacitor,
}

/// Total value for every selector code of a parallel-component adder.
///
/// Bit `n` of the code switches `values[n]` in parallel with `default`.
/// A zero resistance is treated as absent; an all-absent resistor code
/// yields `0.0`.
pub fn parallel_totals(kind: ParallelKind, default: f64, values: &[f64]) -> Vec<f64> {
    (0..1usize << values.len())
        .map(|code| {
            let selected = values
                .iter()
                .enumerate()
                .filter(|(bit, _)| code & (1 << bit) != 0)
                .map(|(_, &v)| v);
            match kind {
                ParallelKind::Capacitor => default + selected.sum::<f64>(),
                ParallelKind::Resistor => {
                    let mut g = if default != 0.0 { 1.0 / default } else { 0.0 };
                    for r in selected.filter(|&r| r != 0.0) {
                        g += 1.0 / r;
                    }
                    if g != 0.0 {
                        1.0 / g
                    } else {
                        0.0
                    }
                }
            }
        })
        .collect()
}

/// Sum of conductances of the non-zero resistors.
pub fn parallel_conductance(r: &[f64]) -> f64 {
    r.iter().filter(|&&res| res != 0.0).map(|res| 1.0 / res).sum()
}
