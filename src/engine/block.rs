//! Audio block type passed between the stream driver and the filter engine
//!
//! A block is never modified in place by a processing stage: every stage
//! returns a new block built from the samples it received.

use num_traits::Zero;
use rustfft::num_complex::Complex64;

use crate::error::{FilterError, Result};

/// A block of frequency-domain bins produced by the stream driver
pub type SpectrumBlock = AudioBlock<Complex64>;

/// One unit of streamed audio
///
/// Samples are interleaved for multi-channel blocks: [L0, R0, L1, R1, ...].
/// The filter engine itself only processes mono blocks; a multi-channel
/// stream uses one engine per channel (see [`AudioBlock::split_channels`]).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock<S = f64> {
    sequence: u64,
    channels: usize,
    samples: Vec<S>,
}

impl<S> AudioBlock<S> {
    /// Create a mono block
    pub fn mono(sequence: u64, samples: Vec<S>) -> Self {
        Self {
            sequence,
            channels: 1,
            samples,
        }
    }

    /// Create a block from interleaved samples
    pub fn interleaved(sequence: u64, channels: usize, samples: Vec<S>) -> Result<Self> {
        if channels == 0 {
            return Err(FilterError::InvalidInput {
                reason: "a block needs at least one channel".to_string(),
            });
        }
        if samples.len() % channels != 0 {
            return Err(FilterError::shape(
                "interleaved block",
                format!("a multiple of {} samples", channels),
                samples.len(),
            ));
        }
        Ok(Self {
            sequence,
            channels,
            samples,
        })
    }

    /// Timestamp counter assigned by the driver
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of interleaved channels
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<S> {
        self.samples
    }

    /// Build the next-stage block: same layout, new sequence and samples
    pub(crate) fn derive(&self, sequence: u64, samples: Vec<S>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            sequence,
            channels: self.channels,
            samples,
        }
    }
}

impl<S: Clone> AudioBlock<S> {
    /// Split an interleaved block into one mono block per channel
    pub fn split_channels(&self) -> Vec<AudioBlock<S>> {
        (0..self.channels)
            .map(|ch| {
                let samples = self
                    .samples
                    .iter()
                    .skip(ch)
                    .step_by(self.channels)
                    .cloned()
                    .collect();
                AudioBlock::mono(self.sequence, samples)
            })
            .collect()
    }

    /// Interleave mono blocks of equal length back into one block
    pub fn merge_channels(sequence: u64, blocks: &[AudioBlock<S>]) -> Result<Self> {
        let Some(first) = blocks.first() else {
            return Err(FilterError::InvalidInput {
                reason: "cannot merge zero channels".to_string(),
            });
        };
        let frames = first.len();

        let mut samples = Vec::with_capacity(frames * blocks.len());
        for frame in 0..frames {
            for block in blocks {
                if block.channels != 1 {
                    return Err(FilterError::ChannelMismatch {
                        expected: 1,
                        actual: block.channels,
                    });
                }
                let sample = block.samples.get(frame).ok_or_else(|| {
                    FilterError::shape("merged channel", frames, block.len())
                })?;
                samples.push(sample.clone());
            }
        }

        Ok(Self {
            sequence,
            channels: blocks.len(),
            samples,
        })
    }
}

impl<S: Zero + Clone> AudioBlock<S> {
    /// A mono block of `len` zero samples
    pub fn silent(sequence: u64, len: usize) -> Self {
        Self::mono(sequence, vec![S::zero(); len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_block() {
        let block = AudioBlock::mono(7, vec![0.1, 0.2, 0.3]);
        assert_eq!(block.sequence(), 7);
        assert_eq!(block.num_channels(), 1);
        assert_eq!(block.num_frames(), 3);
    }

    #[test]
    fn test_interleaved_rejects_ragged_samples() {
        let result = AudioBlock::interleaved(0, 2, vec![0.0, 1.0, 2.0]);
        assert!(matches!(result, Err(FilterError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_split_and_merge_channels() {
        let block = AudioBlock::interleaved(3, 2, vec![1.0, -1.0, 2.0, -2.0]).unwrap();
        let channels = block.split_channels();
        assert_eq!(channels[0].samples(), &[1.0, 2.0]);
        assert_eq!(channels[1].samples(), &[-1.0, -2.0]);

        let merged = AudioBlock::merge_channels(3, &channels).unwrap();
        assert_eq!(merged, block);
    }

    #[test]
    fn test_silent_block() {
        let block: AudioBlock = AudioBlock::silent(0, 256);
        assert_eq!(block.len(), 256);
        assert!(block.samples().iter().all(|&s| s == 0.0));
    }
}
