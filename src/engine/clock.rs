//! Sample clock shared by every module of a circuit.

use crate::error::{DiscreteError, Result};

/// Sample rate and sample period of a running circuit.
///
/// Fixed at construction and on [`crate::Simulator::reinitialize`]; every
/// module derives its cached exponents from it during reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    sample_rate: f64,
    sample_time: f64,
}

impl SampleClock {
    /// Create a clock for the given sample rate in Hz.
    pub fn new(sample_rate: f64) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DiscreteError::InvalidSampleRate { sample_rate });
        }
        Ok(Self {
            sample_rate,
            sample_time: 1.0 / sample_rate,
        })
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds per sample.
    pub fn sample_time(&self) -> f64 {
        self.sample_time
    }

    /// Per-sample charge factor of an RC network: `1 - exp(-T / rc)`.
    ///
    /// Applied as `v += (target - v) * k`. A non-positive time constant
    /// means the node follows its target instantly.
    pub fn rc_charge_exp(&self, rc: f64) -> f64 {
        if rc <= 0.0 {
            return 1.0;
        }
        1.0 - (-self.sample_time / rc).exp()
    }
}
