//! Module kinds evaluated by the engine.
//!
//! Every kind is a flat struct implementing [`Primitive`]. [`Component`]
//! wraps them in one enum so a circuit is a plain `Vec` of nodes:
//!
//! - Arithmetic: adder, gain, divider, clamp, lookup table, diode mixer
//! - Op-amp circuits: integrators, Norton stage, one-shot, triggered VCA
//! - Networks: resistor-ladder DAC, parallel-component adder, mixer
//! - Logic: gates, flip-flops, shift register, bit decoder, X-time gates
//! - Switching and timing: sample & hold, switches, multiplexer, one-shot,
//!   ramp
//! - Postfix formula transform
//!
//! Helpers shared by several kinds live in `rc` (RC and Norton formulas),
//! `trigger` (trigger functions) and `table` (reset-time tables).

mod definition;
mod integrator;
mod ladder;
mod logic;
mod math;
mod mixer;
mod opamp;
mod rc;
mod switches;
mod table;
mod timing;
mod transform;
mod trigger;
mod xtime;

pub use integrator::{Integrator, IntegratorConfig, IntegratorKind};
pub use ladder::{CompAdder, DacR1, DacR1Config};
pub use logic::{
    BitsDecode, DFlipFlop, GateOp, JkFlipFlop, LogicGate, LogicInverter, ShiftClock, ShiftConfig,
    ShiftRegister, MAX_SHIFT_BITS,
};
pub use math::{Adder, Clamp, DiodeMix, Divider, Gain, Lookup};
pub use mixer::{Mixer, MixerConfig, MixerKind, MAX_MIXER_INPUTS};
pub use opamp::{
    NortonOpAmp, OneShotOpAmpConfig, OpAmpConfig, OpAmpOneShot, TriggeredVca, TvcaConfig,
};
pub use rc::{OP_AMP_NORTON_VBE, OP_AMP_VP_RAIL_OFFSET};
pub use switches::{AnalogSwitch, Multiplex, SampleHold, SampleHoldMode, Switch};
pub use table::{ladder_levels, parallel_totals, LadderTable, ParallelKind, DISC_LADDER_MAXRES};
pub use timing::{OneShot, OneShotMode, Ramp};
pub use transform::{compile, evaluate, Program, Transform, TRANSFORM_INPUTS};
pub use trigger::TriggerFunction;
pub use xtime::{XTimeGate, XTimeOp};

use crate::engine::Context;
use crate::error::Result;

/// Behaviour shared by every module kind.
///
/// `inputs` holds the current value of each bound input slot, with unbound
/// optional slots already filled with their defaults. `outputs` has one
/// entry per output port.
pub trait Primitive {
    /// Recompute derived constants and return to the power-up state.
    /// Called before the first sample and again on every reinitialisation.
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()>;

    /// Advance one sample. Must not fail, block or allocate.
    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>);
}

/// Largest number of inputs of the variable-width gates.
pub const MAX_GATE_INPUTS: usize = 4;

/// Input arity of a module kind.
///
/// At least `min` inputs must be bound and at most `max`. Slots from `min`
/// up to `min + defaults.len()` that were not bound read the matching
/// default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub min: usize,
    pub max: usize,
    pub defaults: &'static [f64],
}

impl InputSpec {
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: n,
            defaults: &[],
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            defaults: &[],
        }
    }

    /// `min` required inputs followed by optional ones with defaults.
    pub const fn with_defaults(min: usize, defaults: &'static [f64]) -> Self {
        Self {
            min,
            max: min + defaults.len(),
            defaults,
        }
    }

    /// Number of slots the module sees when `bound` inputs are given.
    pub fn slots(&self, bound: usize) -> usize {
        bound.max(self.min + self.defaults.len())
    }

    /// Human-readable arity for error messages.
    pub fn describe(&self) -> String {
        if self.min == self.max {
            self.min.to_string()
        } else {
            format!("{} to {}", self.min, self.max)
        }
    }
}

/// One module instance of any kind.
#[derive(Debug, Clone)]
pub enum Component {
    Adder(Adder),
    Gain(Gain),
    Divider(Divider),
    Clamp(Clamp),
    Lookup(Lookup),
    DiodeMix(DiodeMix),
    Integrator(Integrator),
    OpAmp(NortonOpAmp),
    OpAmpOneShot(OpAmpOneShot),
    TriggeredVca(TriggeredVca),
    DacR1(DacR1),
    CompAdder(CompAdder),
    Mixer(Mixer),
    Gate(LogicGate),
    Inverter(LogicInverter),
    DFlipFlop(DFlipFlop),
    JkFlipFlop(JkFlipFlop),
    Shift(ShiftRegister),
    BitsDecode(BitsDecode),
    XTime(XTimeGate),
    SampleHold(SampleHold),
    Switch(Switch),
    AnalogSwitch(AnalogSwitch),
    Multiplex(Multiplex),
    OneShot(OneShot),
    Ramp(Ramp),
    Transform(Transform),
}

impl Component {
    /// Arity of this module's inputs.
    pub fn input_spec(&self) -> InputSpec {
        match self {
            Component::Adder(_) => InputSpec::range(2, 1 + MAX_MIXER_INPUTS),
            // in, gain, offset
            Component::Gain(_) => InputSpec::with_defaults(1, &[1.0, 0.0]),
            // in, divisor, enable
            Component::Divider(_) => InputSpec::with_defaults(2, &[1.0]),
            Component::Clamp(_) => InputSpec::exact(3),
            Component::Lookup(_) => InputSpec::exact(1),
            Component::DiodeMix(_) => InputSpec::range(1, MAX_MIXER_INPUTS),
            // trg0, trg1
            Component::Integrator(_) => InputSpec::with_defaults(1, &[0.0]),
            // enable, in0, in1
            Component::OpAmp(_) => InputSpec::with_defaults(2, &[0.0]),
            Component::OpAmpOneShot(_) => InputSpec::exact(1),
            // trg0, trg1, trg2, in0, in1
            Component::TriggeredVca(_) => InputSpec::with_defaults(1, &[0.0, 0.0, 0.0, 0.0]),
            Component::DacR1(_) => InputSpec::exact(1),
            Component::CompAdder(_) => InputSpec::exact(1),
            Component::Mixer(m) => InputSpec::exact(m.input_count()),
            Component::Gate(g) => match g.op() {
                GateOp::Xor | GateOp::Xnor => InputSpec::exact(2),
                _ => InputSpec::range(2, MAX_GATE_INPUTS),
            },
            Component::Inverter(_) => InputSpec::exact(1),
            Component::DFlipFlop(_) => InputSpec::exact(4),
            Component::JkFlipFlop(_) => InputSpec::exact(5),
            Component::Shift(_) => InputSpec::exact(3),
            Component::BitsDecode(_) => InputSpec::exact(1),
            Component::XTime(x) => match x.op() {
                XTimeOp::Buffer => InputSpec::exact(1),
                _ => InputSpec::exact(2),
            },
            Component::SampleHold(_) => InputSpec::exact(2),
            Component::Switch(_) => InputSpec::exact(4),
            Component::AnalogSwitch(_) => InputSpec::exact(3),
            Component::Multiplex(_) => InputSpec::range(2, 1 + MAX_MIXER_INPUTS),
            Component::OneShot(_) => InputSpec::exact(4),
            Component::Ramp(_) => InputSpec::exact(6),
            Component::Transform(_) => InputSpec::range(1, TRANSFORM_INPUTS),
        }
    }

    /// Number of output ports.
    pub fn num_outputs(&self) -> usize {
        match self {
            Component::BitsDecode(b) => b.count(),
            _ => 1,
        }
    }

    /// Netlist keyword of this kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Component::Adder(_) => "ADDER",
            Component::Gain(_) => "GAIN",
            Component::Divider(_) => "DIVIDE",
            Component::Clamp(_) => "CLAMP",
            Component::Lookup(_) => "LOOKUP",
            Component::DiodeMix(_) => "DIODE_MIX",
            Component::Integrator(_) => "INTEGRATOR",
            Component::OpAmp(_) => "OPAMP",
            Component::OpAmpOneShot(_) => "OPAMP_ONESHOT",
            Component::TriggeredVca(_) => "TVCA",
            Component::DacR1(_) => "DAC_R1",
            Component::CompAdder(_) => "COMP_ADDER",
            Component::Mixer(_) => "MIXER",
            Component::Gate(g) => match g.op() {
                GateOp::And => "AND",
                GateOp::Nand => "NAND",
                GateOp::Or => "OR",
                GateOp::Nor => "NOR",
                GateOp::Xor => "XOR",
                GateOp::Xnor => "XNOR",
            },
            Component::Inverter(_) => "NOT",
            Component::DFlipFlop(_) => "DFF",
            Component::JkFlipFlop(_) => "JKFF",
            Component::Shift(_) => "SHIFT",
            Component::BitsDecode(_) => "BITS_DECODE",
            Component::XTime(x) => match x.op() {
                XTimeOp::Buffer => "XTIME_BUFFER",
                XTimeOp::And => "XTIME_AND",
                XTimeOp::Or => "XTIME_OR",
                XTimeOp::Xor => "XTIME_XOR",
            },
            Component::SampleHold(_) => "SAMPHOLD",
            Component::Switch(_) => "SWITCH",
            Component::AnalogSwitch(_) => "ASWITCH",
            Component::Multiplex(_) => "MULTIPLEX",
            Component::OneShot(_) => "ONESHOT",
            Component::Ramp(_) => "RAMP",
            Component::Transform(_) => "TRANSFORM",
        }
    }

    fn primitive_mut(&mut self) -> &mut dyn Primitive {
        match self {
            Component::Adder(p) => p,
            Component::Gain(p) => p,
            Component::Divider(p) => p,
            Component::Clamp(p) => p,
            Component::Lookup(p) => p,
            Component::DiodeMix(p) => p,
            Component::Integrator(p) => p,
            Component::OpAmp(p) => p,
            Component::OpAmpOneShot(p) => p,
            Component::TriggeredVca(p) => p,
            Component::DacR1(p) => p,
            Component::CompAdder(p) => p,
            Component::Mixer(p) => p,
            Component::Gate(p) => p,
            Component::Inverter(p) => p,
            Component::DFlipFlop(p) => p,
            Component::JkFlipFlop(p) => p,
            Component::Shift(p) => p,
            Component::BitsDecode(p) => p,
            Component::XTime(p) => p,
            Component::SampleHold(p) => p,
            Component::Switch(p) => p,
            Component::AnalogSwitch(p) => p,
            Component::Multiplex(p) => p,
            Component::OneShot(p) => p,
            Component::Ramp(p) => p,
            Component::Transform(p) => p,
        }
    }
}

impl Primitive for Component {
    fn reset(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) -> Result<()> {
        self.primitive_mut().reset(inputs, outputs, ctx)
    }

    fn step(&mut self, inputs: &[f64], outputs: &mut [f64], ctx: &mut Context<'_>) {
        self.primitive_mut().step(inputs, outputs, ctx)
    }
}
