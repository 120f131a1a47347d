//! Main simulator interface.

use tracing::{debug, info};

use crate::circuit::{Circuit, Source};
use crate::components::Primitive;
use crate::error::{DiscreteError, Result};

use super::{Context, Diagnostics, SampleClock};

/// Largest number of input slots a single module may have.
pub const MAX_INPUTS: usize = 24;

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Gain applied to the sum of the output taps.
    pub master_gain: f64,
    /// Symmetric bound on the final output, if any.
    pub output_limit: Option<f64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            master_gain: 1.0,
            output_limit: None,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gain applied to the summed output taps.
    pub fn with_master_gain(mut self, master_gain: f64) -> Self {
        self.master_gain = master_gain;
        self
    }

    /// Bound the output to `[-limit, limit]`.
    ///
    /// Taps are summed in volts, so a circuit running from a 5 V supply
    /// usually wants a master gain of about 0.2 with a limit of 1.0 before
    /// its output is used as audio.
    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = Some(limit.abs());
        self
    }
}

/// Steps every module of a circuit once per sample.
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    config: SimulatorConfig,
    clock: SampleClock,
    diagnostics: Diagnostics,
    /// Current parameter values, indexed by `ParamId`
    params: Vec<f64>,
    /// Output slots of every node, laid out back to back
    outputs: Vec<f64>,
    /// Start of each node's outputs, plus the end of the last
    offsets: Vec<usize>,
    /// Gathered inputs of the node being evaluated
    scratch: [f64; MAX_INPUTS],
}

/// Copy the current value of every source into `scratch`.
fn gather(
    sources: &[Source],
    params: &[f64],
    outputs: &[f64],
    offsets: &[usize],
    scratch: &mut [f64; MAX_INPUTS],
) -> usize {
    for (slot, source) in scratch.iter_mut().zip(sources) {
        *slot = match *source {
            Source::Constant(v) => v,
            Source::Param(id) => params[id.0],
            Source::Output { node, port } => outputs[offsets[node.0] + port],
        };
    }
    sources.len()
}

impl Simulator {
    /// Create a simulator and reset every module at `sample_rate`.
    pub fn new(circuit: Circuit, sample_rate: f64) -> Result<Self> {
        Self::with_config(circuit, sample_rate, SimulatorConfig::default())
    }

    /// Create a simulator with a custom configuration.
    pub fn with_config(circuit: Circuit, sample_rate: f64, config: SimulatorConfig) -> Result<Self> {
        let clock = SampleClock::new(sample_rate)?;

        let mut offsets = Vec::with_capacity(circuit.nodes.len() + 1);
        let mut total = 0;
        for node in &circuit.nodes {
            offsets.push(total);
            total += node.num_outputs;
        }
        offsets.push(total);

        let params = circuit.params.iter().map(|p| p.value).collect();

        let mut simulator = Self {
            circuit,
            config,
            clock,
            diagnostics: Diagnostics::new(),
            params,
            outputs: vec![0.0; total],
            offsets,
            scratch: [0.0; MAX_INPUTS],
        };
        simulator.reinitialize(sample_rate)?;
        Ok(simulator)
    }

    /// Reset every module in evaluation order, as on power-up.
    ///
    /// Each module is reset with the values its feeders produced during
    /// their own reset. Parameter values are kept. Modules are reset on a
    /// copy of the graph, so on error the simulator is left as it was.
    pub fn reinitialize(&mut self, sample_rate: f64) -> Result<()> {
        let clock = SampleClock::new(sample_rate)?;
        let mut nodes = self.circuit.nodes.clone();
        let mut diagnostics = Diagnostics::new();
        let mut outputs = vec![0.0; self.outputs.len()];

        let Self {
            params,
            offsets,
            scratch,
            ..
        } = self;

        for (index, node) in nodes.iter_mut().enumerate() {
            let n = gather(&node.inputs, params, &outputs, offsets, scratch);
            let mut ctx = Context::new(&node.name, &clock, &mut diagnostics);
            node.component
                .reset(&scratch[..n], &mut outputs[offsets[index]..offsets[index + 1]], &mut ctx)?;
            debug!(node = %node.name, kind = node.component.kind_name(), "reset");
        }

        self.circuit.nodes = nodes;
        self.clock = clock;
        self.diagnostics = diagnostics;
        self.outputs = outputs;

        info!(
            nodes = self.circuit.nodes.len(),
            sample_rate = self.clock.sample_rate(),
            "circuit initialized"
        );
        Ok(())
    }

    /// Step every module once and return the mixed output.
    pub fn advance_one_sample(&mut self) -> f64 {
        let Self {
            circuit,
            clock,
            diagnostics,
            params,
            outputs,
            offsets,
            scratch,
            ..
        } = self;

        for (index, node) in circuit.nodes.iter_mut().enumerate() {
            let n = gather(&node.inputs, params, outputs, offsets, scratch);
            let mut ctx = Context::new(&node.name, clock, diagnostics);
            node.component
                .step(&scratch[..n], &mut outputs[offsets[index]..offsets[index + 1]], &mut ctx);
        }

        self.mix()
    }

    fn mix(&self) -> f64 {
        let sum: f64 = self
            .circuit
            .outputs
            .iter()
            .map(|tap| self.outputs[self.offsets[tap.node.0] + tap.port] * tap.gain)
            .sum();
        let v = sum * self.config.master_gain;
        match self.config.output_limit {
            Some(limit) => v.max(-limit).min(limit),
            None => v,
        }
    }

    /// Change a named parameter. Takes effect on the next sample.
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        let id = self.circuit.find_param(name).ok_or_else(|| DiscreteError::NodeNotFound {
            name: name.to_string(),
        })?;
        if !value.is_finite() {
            return Err(DiscreteError::config(name, "parameter value is not finite"));
        }
        self.params[id.0] = value;
        Ok(())
    }

    /// Current value of a named parameter.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.circuit.find_param(name).map(|id| self.params[id.0])
    }

    /// Set the parameter driven by the input stream, if the circuit has one.
    pub fn set_input(&mut self, value: f64) {
        if let Some(id) = self.circuit.input_param() {
            self.params[id.0] = value;
        }
    }

    /// Output `port` of a module as of the last sample.
    pub fn node_output(&self, name: &str, port: usize) -> Option<f64> {
        let id = self.circuit.find_node(name)?;
        if port >= self.circuit.nodes[id.0].num_outputs {
            return None;
        }
        Some(self.outputs[self.offsets[id.0] + port])
    }

    /// Process a block of samples, feeding `input` to the input parameter.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        for (sample, out) in input.iter().zip(output.iter_mut()) {
            self.set_input(*sample as f64);
            *out = self.advance_one_sample() as f32;
        }
    }

    /// Render `output.len()` samples without touching the input parameter.
    pub fn render(&mut self, output: &mut [f32]) {
        for out in output.iter_mut() {
            *out = self.advance_one_sample() as f32;
        }
    }

    /// Faults reported since the last reinitialization.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn sample_rate(&self) -> f64 {
        self.clock.sample_rate()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{CircuitBuilder, Input};
    use crate::components::{Adder, Component, Lookup};
    use crate::dsl::parse;
    use crate::engine::Fault;
    use approx::assert_abs_diff_eq;

    fn load(netlist: &str, sample_rate: f64) -> Simulator {
        let circuit = Circuit::from_ast(parse(netlist).unwrap()).unwrap();
        Simulator::new(circuit, sample_rate).unwrap()
    }

    #[test]
    fn test_adder_scenario() {
        let mut b = CircuitBuilder::new();
        b.param("EN", 1.0).unwrap();
        b.node(
            "SUM",
            Component::Adder(Adder),
            [Input::named("EN"), 1.0.into(), 2.0.into(), 0.5.into(), (-0.25).into()],
        )
        .unwrap();
        b.output("SUM", 0, 1.0).unwrap();
        let mut sim = Simulator::new(b.build().unwrap(), 48000.0).unwrap();

        assert_abs_diff_eq!(sim.advance_one_sample(), 3.25, epsilon = 1e-12);
        sim.set_param("EN", 0.0).unwrap();
        assert_abs_diff_eq!(sim.advance_one_sample(), 0.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut sim = load(
            ".param EN 1\n\
             RAMP R EN 1 100 0 1 0\n\
             ONESHOT P 0 EN 5 0.002\n\
             MIXER M 1 R P r=[10k, 20k] c_f=0.1u\n\
             .output M\n",
            1000.0,
        );
        let run = |sim: &mut Simulator| (0..20).map(|_| sim.advance_one_sample()).collect::<Vec<_>>();

        let first = run(&mut sim);
        sim.reinitialize(1000.0).unwrap();
        let second = run(&mut sim);
        sim.reinitialize(1000.0).unwrap();
        sim.reinitialize(1000.0).unwrap();
        let third = run(&mut sim);

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert!(first.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_divider_reports_once_per_run() {
        let mut sim = load(".param D 0\nDIVIDE Q 1 D\n.output Q\n", 48000.0);

        for _ in 0..3 {
            assert_eq!(sim.advance_one_sample(), f64::MAX);
        }
        assert_eq!(sim.diagnostics().count(Fault::DivideByZero), 1);

        sim.set_param("D", 2.0).unwrap();
        assert_abs_diff_eq!(sim.advance_one_sample(), 0.5);

        sim.set_param("D", 0.0).unwrap();
        sim.advance_one_sample();
        sim.advance_one_sample();
        assert_eq!(sim.diagnostics().count(Fault::DivideByZero), 2);
        assert_eq!(sim.diagnostics().total(), 2);

        sim.reinitialize(48000.0).unwrap();
        assert_eq!(sim.diagnostics().total(), 0);
    }

    #[test]
    fn test_transform_netlist() {
        let mut sim = load(
            ".param A 2\n.param B 3\n.param C 10\n\
             TRANSFORM T A B C formula=\"01+2*\"\n\
             .output T 0.5\n",
            48000.0,
        );
        assert_abs_diff_eq!(sim.advance_one_sample(), 25.0);
        assert_abs_diff_eq!(sim.node_output("T", 0).unwrap(), 50.0);
        assert_eq!(sim.node_output("T", 1), None);
        assert_eq!(sim.node_output("A", 0), None);

        sim.set_param("C", 1.0).unwrap();
        assert_abs_diff_eq!(sim.advance_one_sample(), 2.5);
        assert_eq!(sim.param("C"), Some(1.0));
    }

    #[test]
    fn test_output_taps_and_config() {
        let circuit = Circuit::from_ast(
            parse(".param X 0\n.input X\nGAIN A X 2\nGAIN B X -1\n.output A\n.output B 3\n").unwrap(),
        )
        .unwrap();
        let config = SimulatorConfig::new().with_master_gain(0.5).with_output_limit(1.0);
        let mut sim = Simulator::with_config(circuit, 44100.0, config).unwrap();

        let mut out = [0.0f32; 3];
        sim.process_block(&[0.5, -0.5, 4.0], &mut out);
        // 0.5 * (2x - 3x) = -0.5x, bounded to [-1, 1]
        assert_abs_diff_eq!(out[0], -0.25);
        assert_abs_diff_eq!(out[1], 0.25);
        assert_abs_diff_eq!(out[2], -1.0);

        let mut rendered = [1.0f32; 2];
        sim.render(&mut rendered);
        assert_abs_diff_eq!(rendered[0], -1.0);
    }

    #[test]
    fn test_bad_parameters_and_rates() {
        let mut sim = load(".param X 1\nGAIN A X\n.output A\n", 48000.0);
        assert!(matches!(sim.set_param("Y", 1.0), Err(DiscreteError::NodeNotFound { .. })));
        assert!(sim.set_param("X", f64::NAN).is_err());
        assert!(matches!(
            sim.reinitialize(0.0),
            Err(DiscreteError::InvalidSampleRate { .. })
        ));
        assert_abs_diff_eq!(sim.sample_rate(), 48000.0);
    }

    #[test]
    fn test_failed_reinitialize_keeps_state() {
        let mut sim = load(
            ".param EN 1\n.param D 0\n\
             RAMP R EN 1 10 0 1 0\n\
             DIVIDE Q 1 D\n\
             LOOKUP L 0 table=[1]\n\
             .output R\n",
            1000.0,
        );
        for _ in 0..20 {
            sim.advance_one_sample();
        }
        let ramp = sim.node_output("R", 0).unwrap();
        assert!(ramp > 0.0);
        assert_eq!(sim.diagnostics().count(Fault::DivideByZero), 1);

        sim.circuit.nodes[2].component = Component::Lookup(Lookup::new(Vec::new()));
        assert!(matches!(
            sim.reinitialize(2000.0),
            Err(DiscreteError::InvalidConfig { .. })
        ));

        assert_abs_diff_eq!(sim.sample_rate(), 1000.0);
        assert_eq!(sim.node_output("R", 0), Some(ramp));
        assert_eq!(sim.diagnostics().count(Fault::DivideByZero), 1);
        assert!(sim.advance_one_sample() > ramp);
    }

    #[test]
    fn test_simulator_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Simulator>();
    }
}
