//! Discrete - sample-accurate discrete analog circuit renderer
//!
//! # Usage
//!
//! ```bash
//! # Render two seconds of a self-running circuit
//! discrete siren.dsc --samples 96000 | ffmpeg -f f32le -ac 1 -ar 48000 -i - siren.wav
//!
//! # Drive the circuit's `.input` parameter from an audio file
//! ffmpeg -i input.wav -f f32le -ac 1 -ar 48000 - | discrete filter.dsc | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! ```

use std::path::PathBuf;

use clap::Parser;
use discrete_core::{
    audio::{process_stream, render_stream, AudioInput, AudioOutput},
    circuit::Circuit,
    dsl,
    engine::SimulatorConfig,
    error::Result,
    Simulator, DEFAULT_SAMPLE_RATE,
};
use tracing::info;

/// Discrete analog sound circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit netlist (.dsc)
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Sample rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Samples to render when the circuit has no `.input`
    #[arg(short = 'n', long, default_value_t = 48000)]
    samples: u64,

    /// Override a parameter, as NAME=VALUE (repeatable)
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, f64)>,

    /// Gain applied to the summed outputs
    #[arg(short, long, default_value_t = 1.0)]
    gain: f64,

    /// Clip the output to [-LIMIT, LIMIT]
    #[arg(short, long)]
    limit: Option<f64>,
}

fn parse_param(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let value = dsl::parse_value(value.trim()).ok_or_else(|| format!("bad value '{}'", value))?;
    Ok((name.trim().to_string(), value))
}

fn main() -> Result<()> {
    // stdout carries audio, so logs go to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();

    let ast = dsl::parse_file(&args.circuit_file)?;
    let circuit = Circuit::from_ast(ast)?;
    let has_input = circuit.input_param().is_some();

    let mut config = SimulatorConfig::new().with_master_gain(args.gain);
    if let Some(limit) = args.limit {
        config = config.with_output_limit(limit);
    }
    let mut simulator = Simulator::with_config(circuit, args.sample_rate, config)?;

    for (name, value) in &args.params {
        simulator.set_param(name, *value)?;
    }

    let mut output = AudioOutput::stdout();
    if has_input {
        let total = process_stream(&mut simulator, &mut AudioInput::stdin(), &mut output)?;
        info!(samples = total, "input stream ended");
    } else {
        render_stream(&mut simulator, args.samples, &mut output)?;
        info!(samples = args.samples, "rendered");
    }

    let faults = simulator.diagnostics().total();
    if faults > 0 {
        info!(faults, "runtime faults were reported");
    }

    Ok(())
}
