//! Weighted mixer.
//!
//! Up to eight inputs combined either by Millman's theorem (a passive
//! resistor network) or by an op-amp summing stage. Any channel resistor can
//! be dynamic: the value of another node is added in series with the static
//! resistor, and a value of exactly 0 disconnects the channel.
//!
//! Filtering is applied in this order: per-input high-pass caps, the output
//! low-pass cap `c_f`, then the DC-blocking amplifier cap `c_amp`.

use crate::engine::Context;
use crate::error::{DiscreteError, Result};

use super::rc::{rc_step, res_2_parallel};
use super::table::parallel_conductance;
use super::Primitive;

/// Maximum number of mixer channels.
pub const MAX_MIXER_INPUTS: usize = 8;

/// Load impedance assumed for the DC-blocking output cap.
const AMP_LOAD: f64 = 100e3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerKind {
    /// Passive resistor network, optionally with `r_f` to ground.
    Resistor,
    /// Inverting op-amp summer with feedback `r_f`. With a non-zero `r_i`
    /// the Millman node drives an inverting amplifier of gain `r_f / r_i`.
    OpAmp,
}

impl MixerKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RESISTOR" | "R" => Some(Self::Resistor),
            "OP_AMP" | "OPAMP" => Some(Self::OpAmp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MixerConfig {
    pub kind: MixerKind,
    /// Static channel resistors.
    pub r: Vec<f64>,
    /// Channels with a dynamic resistor input, in input order.
    pub dynamic: Vec<usize>,
    /// Per-channel input coupling caps; empty or one per channel.
    pub c: Vec<f64>,
    pub r_i: f64,
    pub r_f: f64,
    pub c_f: f64,
    pub c_amp: f64,
    pub v_ref: f64,
    pub gain: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            kind: MixerKind::Resistor,
            r: Vec::new(),
            dynamic: Vec::new(),
            c: Vec::new(),
            r_i: 0.0,
            r_f: 0.0,
            c_f: 0.0,
            c_amp: 0.0,
            v_ref: 0.0,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topology {
    Resistor,
    OpAmp,
    OpAmpWithRi,
}

impl Topology {
    /// Resistance an input cap of a channel with resistor `r` charges through.
    fn cap_resistance(self, r: f64, r_f: f64, r_i: f64) -> f64 {
        match self {
            Topology::Resistor if r_f != 0.0 => res_2_parallel(r, r_f),
            Topology::Resistor | Topology::OpAmp => r,
            Topology::OpAmpWithRi => r + r_i,
        }
    }
}

/// Per-channel runtime state.
#[derive(Debug, Clone, Copy)]
struct Channel {
    r: f64,
    c: f64,
    /// Input slot holding the dynamic resistance, if any.
    r_slot: Option<usize>,
    /// Last dynamic value the exponent was computed for.
    r_last: f64,
    exponent: f64,
    v_cap: f64,
}

/// Inputs: `enable, in0 .. inN-1`, then one resistance per dynamic channel.
#[derive(Debug, Clone)]
pub struct Mixer {
    config: MixerConfig,
    topology: Topology,
    channels: Vec<Channel>,
    /// Conductance of every static path.
    g_static: f64,
    amp_gain: f64,
    exponent_c_f: f64,
    exponent_c_amp: f64,
    v_cap_f: f64,
    v_cap_amp: f64,
}

impl Mixer {
    pub fn new(config: MixerConfig) -> Self {
        let topology = match config.kind {
            MixerKind::Resistor => Topology::Resistor,
            MixerKind::OpAmp if config.r_i != 0.0 => Topology::OpAmpWithRi,
            MixerKind::OpAmp => Topology::OpAmp,
        };
        Self {
            config,
            topology,
            channels: Vec::new(),
            g_static: 0.0,
            amp_gain: 0.0,
            exponent_c_f: 0.0,
            exponent_c_amp: 0.0,
            v_cap_f: 0.0,
            v_cap_amp: 0.0,
        }
    }

    /// Number of bound inputs this mixer expects.
    pub fn input_count(&self) -> usize {
        1 + self.config.r.len() + self.config.dynamic.len()
    }

    fn validate(&self, node: &str) -> Result<()> {
        let c = &self.config;
        let n = c.r.len();
        if n == 0 || n > MAX_MIXER_INPUTS {
            return Err(DiscreteError::config(
                node,
                format!("mixer needs 1 to {} channels, got {}", MAX_MIXER_INPUTS, n),
            ));
        }
        if !c.c.is_empty() && c.c.len() != n {
            return Err(DiscreteError::table_length(node, "c", n, c.c.len()));
        }
        for (i, &ch) in c.dynamic.iter().enumerate() {
            if ch >= n || c.dynamic[..i].contains(&ch) {
                return Err(DiscreteError::config(node, format!("bad dynamic channel {}", ch)));
            }
        }
        for (ch, &r) in c.r.iter().enumerate() {
            if r < 0.0 || (r == 0.0 && !c.dynamic.contains(&ch)) {
                return Err(DiscreteError::config(
                    node,
                    format!("channel {} needs a positive resistor", ch),
                ));
            }
        }
        if c.kind == MixerKind::OpAmp && c.r_f <= 0.0 {
            return Err(DiscreteError::config(node, "op-amp mixer needs r_f"));
        }
        Ok(())
    }
}

impl Primitive for Mixer {
    fn reset(&mut self, _inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.validate(ctx.node())?;
        let n = self.config.r.len();

        let mut channels = Vec::with_capacity(n);
        for ch in 0..n {
            let r = self.config.r[ch];
            let c = self.config.c.get(ch).copied().unwrap_or(0.0);
            let r_slot = self
                .config
                .dynamic
                .iter()
                .position(|&d| d == ch)
                .map(|k| 1 + n + k);
            let exponent = if c != 0.0 && r_slot.is_none() {
                let r_cap = self.topology.cap_resistance(r, self.config.r_f, self.config.r_i);
                ctx.rc_charge_exp(r_cap * c)
            } else {
                0.0
            };
            channels.push(Channel {
                r,
                c,
                r_slot,
                r_last: f64::NAN,
                exponent,
                v_cap: 0.0,
            });
        }

        let static_r: Vec<f64> = channels
            .iter()
            .filter(|ch| ch.r_slot.is_none())
            .map(|ch| ch.r)
            .collect();
        self.g_static = parallel_conductance(&static_r);
        if self.topology == Topology::Resistor && self.config.r_f != 0.0 {
            self.g_static += 1.0 / self.config.r_f;
        }
        if self.topology == Topology::OpAmpWithRi {
            self.g_static += 1.0 / self.config.r_i;
            self.amp_gain = self.config.r_f / self.config.r_i;
        }
        self.channels = channels;

        self.exponent_c_f = 0.0;
        if self.config.c_f != 0.0 {
            let r = if self.topology == Topology::OpAmp {
                self.config.r_f
            } else if self.g_static > 0.0 {
                1.0 / self.g_static
            } else {
                0.0
            };
            self.exponent_c_f = ctx.rc_charge_exp(r * self.config.c_f);
        }
        self.exponent_c_amp = if self.config.c_amp != 0.0 {
            ctx.rc_charge_exp(AMP_LOAD * self.config.c_amp)
        } else {
            0.0
        };
        self.v_cap_f = 0.0;
        self.v_cap_amp = 0.0;
        outputs[0] = 0.0;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        if inputs[0] == 0.0 {
            outputs[0] = 0.0;
            return;
        }
        let v_ref = self.config.v_ref;
        let topology = self.topology;
        let r_f = self.config.r_f;
        let r_i = self.config.r_i;

        let mut g_total = self.g_static;
        let mut i = 0.0;
        let mut dynamic = false;

        for (n, ch) in self.channels.iter_mut().enumerate() {
            let mut v = inputs[1 + n];
            let mut r = ch.r;

            if let Some(slot) = ch.r_slot {
                dynamic = true;
                let r_node = inputs[slot];
                if r_node == 0.0 {
                    continue;
                }
                r += r_node;
                g_total += 1.0 / r;
                if ch.c != 0.0 && r_node != ch.r_last {
                    let r_cap = topology.cap_resistance(r, r_f, r_i);
                    ch.exponent = ctx.rc_charge_exp(r_cap * ch.c);
                    ch.r_last = r_node;
                }
            }

            if ch.c != 0.0 {
                rc_step(&mut ch.v_cap, v - v_ref, ch.exponent);
                v -= ch.v_cap;
            }
            let v_in = if topology == Topology::OpAmp { v_ref - v } else { v };
            i += v_in / r;
        }

        if topology == Topology::OpAmpWithRi {
            i += v_ref / r_i;
        }

        let r_total = if g_total > 0.0 { 1.0 / g_total } else { 0.0 };
        let r_out = if topology == Topology::OpAmp { r_f } else { r_total };
        let mut v = i * r_out;
        if topology == Topology::OpAmpWithRi {
            v = v_ref + self.amp_gain * (v_ref - v);
        }

        if self.config.c_f != 0.0 {
            if dynamic && topology != Topology::OpAmp {
                self.exponent_c_f = ctx.rc_charge_exp(r_total * self.config.c_f);
            }
            rc_step(&mut self.v_cap_f, v - v_ref, self.exponent_c_f);
            v = self.v_cap_f;
        }

        if self.config.c_amp != 0.0 {
            rc_step(&mut self.v_cap_amp, v, self.exponent_c_amp);
            v -= self.v_cap_amp;
        }

        outputs[0] = v * self.config.gain;
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

        fn reset(&mut self, m: &mut Mixer) -> Result<()> {
            let inputs = vec![0.0; m.input_count()];
            let mut ctx = Context::new("MIX", &self.clock, &mut self.diag);
            m.reset(&inputs, &mut [0.0], &mut ctx)
        }

        fn step(&mut self, m: &mut Mixer, inputs: &[f64]) -> f64 {
            let mut out = [0.0];
            let mut ctx = Context::new("MIX", &self.clock, &mut self.diag);
            m.step(inputs, &mut out, &mut ctx);
            out[0]
        }
    }

    #[test]
    fn test_millman_two_equal_resistors() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3, 10e3],
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 4.0, 0.0]), 2.0, epsilon = 1e-12);
        assert_eq!(bench.step(&mut mix, &[0.0, 4.0, 0.0]), 0.0);
    }

    #[test]
    fn test_resistor_mixer_with_load_and_gain() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3],
            r_f: 10e3,
            gain: 2.0,
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        // 10k/10k divider halves 5V, output gain doubles it
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 5.0]), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_op_amp_summer() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            kind: MixerKind::OpAmp,
            r: vec![10e3, 20e3],
            r_f: 20e3,
            v_ref: 0.0,
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        // -(1 * 20k/10k + 2 * 20k/20k)
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 1.0, 2.0]), -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_op_amp_with_ri() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            kind: MixerKind::OpAmp,
            r: vec![10e3],
            r_i: 10e3,
            r_f: 20e3,
            v_ref: 2.5,
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        // Millman node of 4.5V and 2.5V through equal resistors is 3.5V;
        // inverting gain 2 about 2.5V gives 0.5V
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 4.5]), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_dynamic_resistor_disconnects() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3, 0.0],
            dynamic: vec![1],
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        // Channel 1 disconnected: output follows channel 0 unloaded
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 3.0, 0.0, 0.0]), 3.0, epsilon = 1e-12);
        // Channel 1 wired through 10k: equal-weight average
        assert_relative_eq!(bench.step(&mut mix, &[1.0, 3.0, 1.0, 10e3]), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_input_cap_blocks_dc() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3],
            r_f: 10e3,
            c: vec![1e-6],
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        let first = bench.step(&mut mix, &[1.0, 5.0]);
        assert!(first > 2.0);
        let mut v = first;
        for _ in 0..48000 {
            v = bench.step(&mut mix, &[1.0, 5.0]);
        }
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_output_low_pass() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3, 10e3],
            c_f: 1e-6,
            ..Default::default()
        });
        bench.reset(&mut mix).unwrap();
        let first = bench.step(&mut mix, &[1.0, 4.0, 0.0]);
        assert!(first > 0.0 && first < 2.0);
        let mut v = first;
        for _ in 0..9600 {
            v = bench.step(&mut mix, &[1.0, 4.0, 0.0]);
        }
        assert_abs_diff_eq!(v, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_mismatched_caps() {
        let mut bench = Bench::new();
        let mut mix = Mixer::new(MixerConfig {
            r: vec![10e3, 10e3],
            c: vec![1e-6],
            ..Default::default()
        });
        assert!(matches!(
            bench.reset(&mut mix),
            Err(DiscreteError::TableLengthMismatch { .. })
        ));
    }
}
