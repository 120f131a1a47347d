//! Sample-clock driven evaluation engine.
//!
//! - [`SampleClock`]: sample rate, period and RC exponents
//! - [`Diagnostics`]: runtime fault counters
//! - [`Simulator`]: steps every node of a [`crate::Circuit`] once per sample

mod clock;
mod diagnostics;
mod simulator;

pub use clock::SampleClock;
pub use diagnostics::{Diagnostics, Fault, FaultLatch};
pub use simulator::{Simulator, SimulatorConfig, MAX_INPUTS};

/// What a module sees of the engine while it is reset or stepped.
pub struct Context<'a> {
    node: &'a str,
    clock: &'a SampleClock,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Context<'a> {
    pub fn new(node: &'a str, clock: &'a SampleClock, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            node,
            clock,
            diagnostics,
        }
    }

    /// Name of the node being evaluated.
    pub fn node(&self) -> &str {
        self.node
    }

    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    pub fn sample_time(&self) -> f64 {
        self.clock.sample_time()
    }

    /// See [`SampleClock::rc_charge_exp`].
    pub fn rc_charge_exp(&self, rc: f64) -> f64 {
        self.clock.rc_charge_exp(rc)
    }

    /// Report a runtime fault against the current node.
    pub fn report(&mut self, fault: Fault, value: f64) {
        self.diagnostics.report(self.node, fault, value);
    }
}
