//! Raw audio I/O for the CLI frontend.
//!
//! Audio is mono 32-bit little-endian float, as produced and consumed by
//! `ffmpeg -f f32le -ac 1`.

use std::io::{self, Read, Write};

use crate::error::{DiscreteError, Result};
use crate::Simulator;

/// Buffer size for audio processing (in samples).
pub const BUFFER_SIZE: usize = 256;

const SAMPLE_BYTES: usize = 4;

/// Reads f32le samples from a byte stream.
pub struct AudioInput<R> {
    reader: R,
    buffer: Vec<u8>,
    /// Bytes of an incomplete sample left over from the last read
    pending: usize,
}

impl AudioInput<io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<R: Read> AudioInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0u8; BUFFER_SIZE * SAMPLE_BYTES],
            pending: 0,
        }
    }

    /// Read up to `samples.len()` samples.
    /// Returns the number of samples read, or 0 on end of stream.
    pub fn read_block(&mut self, samples: &mut [f32]) -> Result<usize> {
        if samples.is_empty() {
            return Ok(0);
        }
        let wanted = samples.len().min(BUFFER_SIZE) * SAMPLE_BYTES;
        loop {
            let filled = self.pending;
            let read = self
                .reader
                .read(&mut self.buffer[filled..wanted])
                .map_err(|e| DiscreteError::AudioInputError {
                    message: e.to_string(),
                })?;
            if read == 0 {
                // A trailing partial sample is dropped
                return Ok(0);
            }

            let available = filled + read;
            let count = available / SAMPLE_BYTES;
            if count == 0 {
                self.pending = available;
                continue;
            }

            for (sample, bytes) in samples.iter_mut().zip(self.buffer.chunks_exact(SAMPLE_BYTES).take(count)) {
                *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            let used = count * SAMPLE_BYTES;
            self.buffer.copy_within(used..available, 0);
            self.pending = available - used;
            return Ok(count);
        }
    }
}

/// Writes f32le samples to a byte stream.
pub struct AudioOutput<W> {
    writer: W,
    buffer: Vec<u8>,
}

impl AudioOutput<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AudioOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(BUFFER_SIZE * SAMPLE_BYTES),
        }
    }

    /// Write a block of samples.
    pub fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.buffer.clear();
        for sample in samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }
        self.writer
            .write_all(&self.buffer)
            .map_err(|e| DiscreteError::AudioOutputError {
                message: e.to_string(),
            })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| DiscreteError::AudioOutputError {
            message: e.to_string(),
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Run `input` through the simulator's input parameter until it ends.
/// Returns the number of samples processed.
pub fn process_stream<R: Read, W: Write>(
    simulator: &mut Simulator,
    input: &mut AudioInput<R>,
    output: &mut AudioOutput<W>,
) -> Result<u64> {
    let mut in_samples = [0.0f32; BUFFER_SIZE];
    let mut out_samples = [0.0f32; BUFFER_SIZE];
    let mut total = 0;

    loop {
        let samples_read = input.read_block(&mut in_samples)?;
        if samples_read == 0 {
            break;
        }
        simulator.process_block(&in_samples[..samples_read], &mut out_samples[..samples_read]);
        output.write_block(&out_samples[..samples_read])?;
        total += samples_read as u64;
    }

    output.flush()?;
    Ok(total)
}

/// Render `samples` samples of a circuit that has no input stream.
pub fn render_stream<W: Write>(simulator: &mut Simulator, samples: u64, output: &mut AudioOutput<W>) -> Result<()> {
    let mut block = [0.0f32; BUFFER_SIZE];
    let mut remaining = samples;

    while remaining > 0 {
        let n = remaining.min(BUFFER_SIZE as u64) as usize;
        simulator.render(&mut block[..n]);
        output.write_block(&block[..n])?;
        remaining -= n as u64;
    }

    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::dsl::parse;
    use approx::assert_abs_diff_eq;

    /// Hands out its data a few bytes at a time.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn decode(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn simulator(netlist: &str) -> Simulator {
        Simulator::new(Circuit::from_ast(parse(netlist).unwrap()).unwrap(), 48000.0).unwrap()
    }

    #[test]
    fn test_process_stream_with_short_reads() {
        let mut sim = simulator(".param X 0\n.input X\nGAIN G X -2 1\n.output G\n");
        let data: Vec<u8> = [0.5f32, -1.0, 2.0].iter().flat_map(|s| s.to_le_bytes()).collect();

        let mut input = AudioInput::new(Trickle { data, pos: 0 });
        let mut output = AudioOutput::new(Vec::new());
        let total = process_stream(&mut sim, &mut input, &mut output).unwrap();

        assert_eq!(total, 3);
        let samples = decode(&output.into_inner());
        assert_eq!(samples.len(), 3);
        assert_abs_diff_eq!(samples[0], 0.0);
        assert_abs_diff_eq!(samples[1], 3.0);
        assert_abs_diff_eq!(samples[2], -3.0);
    }

    #[test]
    fn test_render_stream() {
        let mut sim = simulator("ADDER A 1 0.25 0.5\n.output A\n");
        let mut output = AudioOutput::new(Vec::new());
        render_stream(&mut sim, 300, &mut output).unwrap();

        let samples = decode(&output.into_inner());
        assert_eq!(samples.len(), 300);
        assert!(samples.iter().all(|&s| s == 0.75));
    }
}
