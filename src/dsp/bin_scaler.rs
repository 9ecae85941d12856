//! Frequency-domain bin gains
//!
//! Entries address bins relative to the spectral layout produced by the
//! frequency transform: `absolute = bin_index + 1 + offset`. The `+ 1` skips
//! the DC bin; the offset belongs to the transform, not to the entries.

use std::collections::BTreeMap;
use std::ops::Mul;
use std::time::Instant;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::metrics::{MetricsCollector, TimingCollector, TimingStats};
use crate::config::EngineConfig;
use crate::engine::AudioBlock;
use crate::error::{FilterError, Result};

/// Operation name used for frequency-domain timings
pub const FREQUENCY_DOMAIN_OPERATION: &str = "process_frequency_domain";

/// One scaled bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFilterEntry {
    /// Bin index relative to the first non-DC bin
    pub bin_index: usize,
    /// Linear gain multiplier
    pub gain: f64,
}

impl FrequencyFilterEntry {
    pub fn new(bin_index: usize, gain: f64) -> Self {
        Self { bin_index, gain }
    }
}

/// Maps entry indices onto absolute spectrum positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BinMapping {
    /// Extra bins between DC and the first addressable band
    #[serde(default)]
    pub offset: usize,
}

impl BinMapping {
    /// Bins skipped at the bottom of the spectrum (DC)
    pub const DC_BINS: usize = 1;

    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Absolute spectrum position of `bin_index`
    pub fn resolve(&self, bin_index: usize) -> usize {
        bin_index + Self::DC_BINS + self.offset
    }
}

/// Scales a fixed set of bins of a frequency-domain block
pub struct FrequencyBinScaler {
    entries: Vec<FrequencyFilterEntry>,
    mapping: BinMapping,
    metrics: Option<Box<dyn TimingCollector>>,
    streaming: bool,
}

impl FrequencyBinScaler {
    pub fn new(config: EngineConfig, mapping: BinMapping) -> Self {
        let metrics: Option<Box<dyn TimingCollector>> = if config.collect_timings {
            Some(Box::new(MetricsCollector::new()))
        } else {
            None
        };
        Self {
            entries: Vec::new(),
            mapping,
            metrics,
            streaming: false,
        }
    }

    /// Create a scaler reporting timings to `collector`
    ///
    /// The collector only receives data when `config.collect_timings` is set.
    pub fn with_collector(
        config: EngineConfig,
        mapping: BinMapping,
        collector: Box<dyn TimingCollector>,
    ) -> Self {
        let mut scaler = Self::new(config, mapping);
        if config.collect_timings {
            scaler.metrics = Some(collector);
        }
        scaler
    }

    pub fn entries(&self) -> &[FrequencyFilterEntry] {
        &self.entries
    }

    pub fn mapping(&self) -> BinMapping {
        self.mapping
    }

    /// Add one bin gain
    ///
    /// # Errors
    /// * `InvalidCoefficients` - if the gain is not finite
    /// * `ConfigurationLocked` - if streaming already started
    pub fn add_entry(&mut self, entry: FrequencyFilterEntry) -> Result<()> {
        if self.streaming {
            return Err(FilterError::ConfigurationLocked {
                operation: "add_entry",
            });
        }
        if !entry.gain.is_finite() {
            return Err(FilterError::InvalidCoefficients {
                reason: format!("gain for bin {} must be finite", entry.bin_index),
            });
        }
        debug!(
            "bin gain {} at bin {} (absolute {})",
            entry.gain,
            entry.bin_index,
            self.mapping.resolve(entry.bin_index)
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Multiply every configured bin by its gain
    ///
    /// With no entries the block is returned as is. Otherwise the result
    /// has its sequence counter reset to 0; this path does not carry the
    /// driver's timestamp forward.
    ///
    /// # Errors
    /// * `BinOutOfRange` - if an entry resolves past the end of the block
    pub fn process_frequency_domain<S>(&mut self, block: &AudioBlock<S>) -> Result<AudioBlock<S>>
    where
        S: Copy + Mul<f64, Output = S>,
    {
        let started = Instant::now();

        let output = if self.entries.is_empty() {
            block.clone()
        } else {
            let mut bins = block.samples().to_vec();
            for entry in &self.entries {
                let bin = self.mapping.resolve(entry.bin_index);
                let value = bins.get_mut(bin).ok_or(FilterError::BinOutOfRange {
                    bin,
                    len: block.len(),
                })?;
                *value = *value * entry.gain;
            }
            self.streaming = true;
            block.derive(0, bins)
        };

        trace!(
            "frequency-domain block {} ({} bins, {} entries)",
            block.sequence(),
            block.len(),
            self.entries.len()
        );
        if let Some(metrics) = &mut self.metrics {
            metrics.record(FREQUENCY_DOMAIN_OPERATION, started.elapsed());
        }

        Ok(output)
    }

    /// Reopen configuration for a new stream
    pub fn reset(&mut self) {
        self.streaming = false;
    }

    /// Return collected timings and reset the collector
    pub fn drain_metrics(&mut self) -> BTreeMap<&'static str, TimingStats> {
        self.metrics
            .as_mut()
            .map(|metrics| metrics.drain())
            .unwrap_or_default()
    }
}

impl Default for FrequencyBinScaler {
    fn default() -> Self {
        Self::new(EngineConfig::default(), BinMapping::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rustfft::num_complex::Complex64;
    use test_case::test_case;

    fn spectrum(len: usize) -> AudioBlock<Complex64> {
        AudioBlock::mono(
            9,
            (0..len)
                .map(|k| Complex64::new(k as f64 + 1.0, -(k as f64) * 0.5))
                .collect(),
        )
    }

    #[test]
    fn test_empty_scaler_is_identity() {
        let mut scaler = FrequencyBinScaler::default();
        let block = spectrum(129);
        let out = scaler.process_frequency_domain(&block).unwrap();
        assert_eq!(out, block);
        assert_eq!(out.sequence(), 9);
    }

    #[test_case(0, 0 ; "first band no offset")]
    #[test_case(4, 0 ; "fifth band no offset")]
    #[test_case(2, 56 ; "shifted layout")]
    fn test_only_addressed_bin_changes(bin_index: usize, offset: usize) {
        let mut scaler = FrequencyBinScaler::new(EngineConfig::default(), BinMapping::new(offset));
        scaler
            .add_entry(FrequencyFilterEntry::new(bin_index, 2.5))
            .unwrap();

        let block = spectrum(129);
        let out = scaler.process_frequency_domain(&block).unwrap();
        let target = bin_index + 1 + offset;

        for (k, (before, after)) in block.samples().iter().zip(out.samples()).enumerate() {
            if k == target {
                assert_eq!(*after, *before * 2.5);
            } else {
                assert_eq!(after, before);
            }
        }
    }

    #[test]
    fn test_sequence_resets_to_zero() {
        let mut scaler = FrequencyBinScaler::default();
        scaler.add_entry(FrequencyFilterEntry::new(0, 0.5)).unwrap();
        let out = scaler.process_frequency_domain(&spectrum(16)).unwrap();
        assert_eq!(out.sequence(), 0);
    }

    #[test]
    fn test_real_valued_bins() {
        let mut scaler = FrequencyBinScaler::default();
        scaler.add_entry(FrequencyFilterEntry::new(1, -1.0)).unwrap();
        let block = AudioBlock::mono(4, vec![1.0, 2.0, 3.0, 4.0]);
        let out = scaler.process_frequency_domain(&block).unwrap();
        assert_eq!(out.samples(), &[1.0, 2.0, -3.0, 4.0]);
    }

    #[test]
    fn test_out_of_range_bin_is_an_error() {
        let mut scaler = FrequencyBinScaler::new(EngineConfig::default(), BinMapping::new(10));
        scaler.add_entry(FrequencyFilterEntry::new(5, 2.0)).unwrap();
        let result = scaler.process_frequency_domain(&spectrum(16));
        assert!(matches!(
            result,
            Err(FilterError::BinOutOfRange { bin: 16, len: 16 })
        ));
    }

    #[test]
    fn test_rejects_non_finite_gain_and_late_entries() {
        let mut scaler = FrequencyBinScaler::default();
        assert!(scaler
            .add_entry(FrequencyFilterEntry::new(0, f64::INFINITY))
            .is_err());

        scaler.add_entry(FrequencyFilterEntry::new(0, 2.0)).unwrap();
        scaler.process_frequency_domain(&spectrum(8)).unwrap();
        assert!(matches!(
            scaler.add_entry(FrequencyFilterEntry::new(1, 2.0)),
            Err(FilterError::ConfigurationLocked { .. })
        ));

        scaler.reset();
        assert!(scaler.add_entry(FrequencyFilterEntry::new(1, 2.0)).is_ok());
    }

    #[test]
    fn test_timings_collected() {
        let mut scaler = FrequencyBinScaler::new(
            EngineConfig {
                collect_timings: true,
            },
            BinMapping::default(),
        );
        scaler.process_frequency_domain(&spectrum(8)).unwrap();
        let metrics = scaler.drain_metrics();
        assert_eq!(metrics[FREQUENCY_DOMAIN_OPERATION].calls, 1);
    }
}
