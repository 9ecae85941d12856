//! Block stream driver
//!
//! Feeds a signal through the two processing callbacks:
//!
//! 1. The time-domain callback sees consecutive, non-overlapping hop-sized
//!    blocks in increasing sequence order, so every sample passes through
//!    the IIR recursion exactly once and delay state stays continuous.
//! 2. The filtered signal is cut into overlapping `block_size` frames, Hann
//!    windowed and transformed. The callback receives the half spectrum
//!    (`block_size / 2 + 1` bins, DC first). The spectrum is mirrored back,
//!    inverse transformed and overlap-added, normalised by the summed
//!    analysis window.

use std::sync::Arc;

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use tracing::{debug, debug_span};

use super::block::{AudioBlock, SpectrumBlock};
use crate::config::StreamConfig;
use crate::error::{FilterError, Result};

/// Window sums below this are treated as uncovered
const NORM_EPSILON: f64 = 1e-12;

/// Slices a signal into blocks and reassembles the processed result
pub struct BlockStreamDriver {
    config: StreamConfig,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl BlockStreamDriver {
    /// Plan transforms for `config.block_size`
    ///
    /// # Errors
    /// * `InvalidStreamConfig` - odd or tiny block size, overlap >= 100%
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;

        let size = config.block_size;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        // Periodic Hann; without overlap it would zero the frame edges
        let window = if config.hop_size() < size {
            (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()))
                .collect()
        } else {
            vec![1.0; size]
        };

        Ok(Self {
            config,
            window,
            forward,
            inverse,
        })
    }

    pub fn config(&self) -> StreamConfig {
        self.config
    }

    /// Run `signal` through both callbacks and return the reassembled output
    ///
    /// The output has exactly as many samples as the input. Either callback
    /// may simply return a copy of its block.
    ///
    /// # Errors
    /// Any callback error is returned as is. A callback that changes the
    /// block length yields `ShapeMismatch`.
    pub fn process<T, F>(&self, signal: &[f64], mut time_fn: T, mut freq_fn: F) -> Result<Vec<f64>>
    where
        T: FnMut(&AudioBlock) -> Result<AudioBlock>,
        F: FnMut(&SpectrumBlock) -> Result<SpectrumBlock>,
    {
        if signal.is_empty() {
            return Ok(Vec::new());
        }

        let size = self.config.block_size;
        let hop = self.config.hop_size();
        let _span = debug_span!("stream", samples = signal.len(), size, hop).entered();

        let filtered = self.run_time_domain(signal, hop, &mut time_fn)?;

        // Lead-in so the first real sample is covered by a full set of frames
        let lead = size - hop.min(size);
        let covered = lead + filtered.len();
        let mut frames = if covered <= size {
            1
        } else {
            (covered - size).div_ceil(hop) + 1
        };
        if self.config.zero_pad {
            frames += 1;
        }

        let padded_len = (frames - 1) * hop + size;
        let mut padded = vec![0.0; padded_len];
        padded[lead..lead + filtered.len()].copy_from_slice(&filtered);

        let mut accumulated = vec![0.0; padded_len];
        let mut norm = vec![0.0; padded_len];
        let mut buffer = vec![Complex64::new(0.0, 0.0); size];
        let half = self.config.spectrum_len();

        for frame in 0..frames {
            let start = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex64::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);

            let spectrum = AudioBlock::mono(frame as u64, buffer[..half].to_vec());
            let processed = freq_fn(&spectrum)?;
            if processed.len() != half {
                return Err(FilterError::shape("spectrum block", half, processed.len()));
            }

            mirror_spectrum(processed.samples(), &mut buffer);
            self.inverse.process(&mut buffer);

            let scale = 1.0 / size as f64;
            for (i, bin) in buffer.iter().enumerate() {
                accumulated[start + i] += bin.re * scale;
                norm[start + i] += self.window[i];
            }
        }

        debug!(frames, "stream reassembled");

        Ok((lead..lead + filtered.len())
            .map(|i| {
                if norm[i] > NORM_EPSILON {
                    accumulated[i] / norm[i]
                } else {
                    0.0
                }
            })
            .collect())
    }

    fn run_time_domain<T>(&self, signal: &[f64], hop: usize, time_fn: &mut T) -> Result<Vec<f64>>
    where
        T: FnMut(&AudioBlock) -> Result<AudioBlock>,
    {
        let mut filtered = Vec::with_capacity(signal.len());
        for (sequence, chunk) in signal.chunks(hop).enumerate() {
            let block = AudioBlock::mono(sequence as u64, chunk.to_vec());
            let processed = time_fn(&block)?;
            if processed.len() != chunk.len() {
                return Err(FilterError::shape("time-domain block", chunk.len(), processed.len()));
            }
            filtered.extend_from_slice(processed.samples());
        }
        Ok(filtered)
    }
}

/// Rebuild a full Hermitian spectrum from its lower half
fn mirror_spectrum(half: &[Complex64], full: &mut [Complex64]) {
    let size = full.len();
    full[..half.len()].copy_from_slice(half);
    for k in 1..size - half.len() + 1 {
        full[size - k] = half[k].conj();
    }
}
