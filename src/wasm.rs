//! WASM bindings for Discrete Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuit } from 'discrete_core';
//!
//! await init();
//!
//! const netlist = `
//!   .param LEVEL 0.5
//!   .param IN 0
//!   .input IN
//!   GAIN OUT IN LEVEL
//!   .output OUT
//! `;
//!
//! const circuit = new WasmCircuit(netlist, 48000);
//!
//! // In AudioWorkletProcessor.process():
//! circuit.process_block(inputs[0][0], outputs[0][0]);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::Circuit;
use crate::dsl;
use crate::engine::{Simulator, SimulatorConfig};
use crate::error::DiscreteError;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: DiscreteError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A running circuit for Web Audio.
#[wasm_bindgen]
pub struct WasmCircuit {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmCircuit {
    /// Parse, build and reset a circuit.
    ///
    /// Throws the error message if the netlist is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist: &str, sample_rate: f64) -> Result<WasmCircuit, JsValue> {
        Self::with_output(netlist, sample_rate, 1.0, 0.0)
    }

    /// Like the constructor, with a master gain and an output limit
    /// (0 for none).
    #[wasm_bindgen]
    pub fn with_output(netlist: &str, sample_rate: f64, gain: f64, limit: f64) -> Result<WasmCircuit, JsValue> {
        let ast = dsl::parse(netlist).map_err(to_js)?;
        let circuit = Circuit::from_ast(ast).map_err(to_js)?;

        let mut config = SimulatorConfig::new().with_master_gain(gain);
        if limit > 0.0 {
            config = config.with_output_limit(limit);
        }
        let simulator = Simulator::with_config(circuit, sample_rate, config).map_err(to_js)?;

        Ok(WasmCircuit { simulator })
    }

    /// Feed `input` to the circuit's `.input` parameter and write one
    /// output sample per input sample.
    #[wasm_bindgen]
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.simulator.process_block(input, output);
    }

    /// Fill `output` without touching the input parameter.
    #[wasm_bindgen]
    pub fn render_block(&mut self, output: &mut [f32]) {
        self.simulator.render(output);
    }

    #[wasm_bindgen]
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), JsValue> {
        self.simulator.set_param(name, value).map_err(to_js)
    }

    /// Output of a module after the last sample, or `undefined`.
    #[wasm_bindgen]
    pub fn node_output(&self, name: &str, port: usize) -> Option<f64> {
        self.simulator.node_output(name, port)
    }

    /// Reset every module, optionally at a new sample rate.
    #[wasm_bindgen]
    pub fn reinitialize(&mut self, sample_rate: f64) -> Result<(), JsValue> {
        self.simulator.reinitialize(sample_rate).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn sample_rate(&self) -> f64 {
        self.simulator.sample_rate()
    }

    /// Runtime faults reported since the last reset.
    #[wasm_bindgen(getter)]
    pub fn fault_count(&self) -> f64 {
        self.simulator.diagnostics().total() as f64
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the default sample rate.
#[wasm_bindgen]
pub fn default_sample_rate() -> f64 {
    crate::DEFAULT_SAMPLE_RATE
}
