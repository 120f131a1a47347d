//! # Discrete Core
//!
//! Sample-by-sample simulation of the discrete analog sound circuits found
//! in vintage arcade and home hardware.
//!
//! A circuit is a fixed list of modules (RC integrators, op-amp stages,
//! logic gates, resistor-ladder DACs, mixers, one-shots, user formulas)
//! evaluated once per sample in declaration order. Each module reads the
//! current outputs of the modules before it and updates its own state with
//! closed-form or single-pole exponential approximations.
//!
//! This library provides:
//! - A netlist language for describing circuits
//! - The module library and the sample-clock driven engine
//! - Sub-sample ("X-time") logic transitions for reduced aliasing
//! - Audio I/O for the CLI and bindings for the browser
//!
//! ## Architecture
//!
//! - [`dsl`] - Parser for the netlist language
//! - [`circuit`] - Circuit graph representation and validation
//! - [`components`] - Module kinds and the shared table and trigger helpers
//! - [`engine`] - Sample clock, fault diagnostics and the simulator
//! - [`audio`] - Raw f32le audio I/O (CLI only)
//!
//! ## Usage
//!
//! ```
//! use discrete_core::{dsl, Circuit, Simulator};
//!
//! let netlist = "
//!     .param A 2
//!     .param B 3
//!     TRANSFORM T A B 10 formula=\"01+2*\"
//!     .output T
//! ";
//! let circuit = Circuit::from_ast(dsl::parse(netlist).unwrap()).unwrap();
//! let mut sim = Simulator::new(circuit, 48000.0).unwrap();
//! assert_eq!(sim.advance_one_sample(), 50.0);
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! discrete siren.dsc --samples 96000 | ffmpeg -f f32le -ac 1 -ar 48000 -i - siren.wav
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmCircuit } from 'discrete_core';
//!
//! const circuit = new WasmCircuit(netlist, 48000);
//! circuit.render_block(outputBuffer);
//! ```

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod engine;
pub mod error;

#[cfg(feature = "cli")]
pub mod audio;

// Re-export main types for convenience
pub use circuit::{Circuit, CircuitBuilder};
pub use engine::{Simulator, SimulatorConfig};
pub use error::{DiscreteError, Result};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuit;

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;
