//! One-shot and ramp generators.

use crate::engine::Context;
use crate::error::Result;

use super::Primitive;

/// Fraction of a sample period below which a countdown counts as expired.
/// Absorbs rounding when a width is a whole number of samples.
const COUNTDOWN_SLACK: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotMode {
    /// Fire on the falling edge of the trigger instead of the rising edge.
    pub falling_edge: bool,
    /// A trigger edge while active restarts the pulse.
    pub retrigger: bool,
    /// Output sits at `amplitude` while idle and drops to 0 while active.
    pub active_low: bool,
}

/// Edge-triggered one-shot. Inputs: `reset, trigger, amplitude, width`.
///
/// `width` is in seconds and is counted down one sample period per sample.
#[derive(Debug, Clone)]
pub struct OneShot {
    mode: OneShotMode,
    active: bool,
    last_trigger: bool,
    countdown: f64,
    out: f64,
}

impl OneShot {
    pub fn new(mode: OneShotMode) -> Self {
        Self {
            mode,
            active: false,
            last_trigger: false,
            countdown: 0.0,
            out: 0.0,
        }
    }

    fn idle_level(&self, amplitude: f64) -> f64 {
        if self.mode.active_low {
            amplitude
        } else {
            0.0
        }
    }

    fn active_level(&self, amplitude: f64) -> f64 {
        if self.mode.active_low {
            0.0
        } else {
            amplitude
        }
    }
}

impl Primitive for OneShot {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        self.active = false;
        self.last_trigger = false;
        self.countdown = 0.0;
        self.out = self.idle_level(inputs[2]);
        outputs[0] = self.out;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let (reset, amplitude, width) = (inputs[0], inputs[2], inputs[3]);
        let trigger = inputs[1] != 0.0;

        // A pulse that was running before this sample counts down this sample
        let mut do_count = self.active;

        if reset != 0.0 {
            self.out = 0.0;
            self.active = false;
            outputs[0] = self.out;
            return;
        }

        if trigger != self.last_trigger {
            self.last_trigger = trigger;
            if trigger != self.mode.falling_edge {
                if !self.active {
                    self.active = true;
                    self.out = self.active_level(amplitude);
                    self.countdown = width;
                } else if self.mode.retrigger {
                    self.countdown = width;
                    do_count = false;
                }
            }
        }

        if do_count {
            self.countdown -= ctx.sample_time();
            if self.countdown <= ctx.sample_time() * COUNTDOWN_SLACK {
                self.out = self.idle_level(amplitude);
                self.countdown = 0.0;
                self.active = false;
            }
        }
        outputs[0] = self.out;
    }
}

/// Linear ramp. Inputs: `enable, direction, gradient, start, end, clamp`.
///
/// While enabled the output moves from `start` toward `end` at `gradient`
/// units per second when `direction` is non-zero, and back toward `start`
/// otherwise, bounded by both. Re-enabling restarts at `start`. Disabled
/// output is `clamp`.
#[derive(Debug, Clone, Default)]
pub struct Ramp {
    /// `end >= start`, fixed at reset.
    ascending: bool,
    last_enable: bool,
    v_out: f64,
}

impl Primitive for Ramp {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], _ctx: &mut Context<'_>) -> Result<()> {
        let (start, end, clamp) = (inputs[3], inputs[4], inputs[5]);
        self.ascending = end >= start;
        self.last_enable = false;
        self.v_out = clamp;
        outputs[0] = self.v_out;
        Ok(())
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        let (enable, direction, gradient) = (inputs[0], inputs[1], inputs[2]);
        let (start, end, clamp) = (inputs[3], inputs[4], inputs[5]);

        if enable == 0.0 {
            self.last_enable = false;
            self.v_out = clamp;
            outputs[0] = self.v_out;
            return;
        }

        if !self.last_enable {
            self.last_enable = true;
            self.v_out = start;
        }
        let step = gradient * ctx.sample_time();
        let rising = (direction != 0.0) == self.ascending;
        if rising {
            self.v_out += step;
        } else {
            self.v_out -= step;
        }

        let (low, high) = if self.ascending { (start, end) } else { (end, start) };
        if self.v_out < low {
            self.v_out = low;
        }
        if self.v_out > high {
            self.v_out = high;
        }
        outputs[0] = self.v_out;
    }
}
