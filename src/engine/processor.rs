//! Whole-file processing
//!
//! `WaveProcessor` ties an input, a configured time-domain engine and a
//! bin scaler to the block stream driver. Every channel gets its own fork
//! of the filter bank so no delay state is shared between channels.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde_json::Value;
use tracing::info_span;

use super::io::{write_wave, WaveData, WaveSource};
use super::stream::BlockStreamDriver;
use crate::config::{EngineConfig, StreamConfig};
use crate::dsp::{BinMapping, FilterBank, FrequencyBinScaler, TimingStats};
use crate::error::Result;

/// Result of processing one input
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub wave: WaveData,
    /// Timings merged over all channels; empty unless timings are collected
    pub timings: BTreeMap<&'static str, TimingStats>,
}

/// Applies the configured filters to a whole waveform
pub struct WaveProcessor {
    source: WaveSource,
    wave: WaveData,
    filter_bank: FilterBank,
    bin_scaler: FrequencyBinScaler,
    stream: StreamConfig,
}

impl WaveProcessor {
    /// Load `source` with unconfigured engines
    ///
    /// # Errors
    /// Any error from reading the input file.
    pub fn new(source: impl Into<WaveSource>, engine: EngineConfig) -> Result<Self> {
        let source = source.into();
        let wave = source.load()?;
        Ok(Self {
            source,
            wave,
            filter_bank: FilterBank::new(engine),
            bin_scaler: FrequencyBinScaler::new(engine, BinMapping::default()),
            stream: StreamConfig::default(),
        })
    }

    /// Load from a dynamic value: a path string or an array of samples
    ///
    /// # Errors
    /// * `InvalidInput` - for any other kind of value
    pub fn from_value(value: Value, engine: EngineConfig) -> Result<Self> {
        Self::new(WaveSource::try_from(value)?, engine)
    }

    /// Replace both engines, e.g. with ones built from a `FilterConfig`
    pub fn with_engines(mut self, filter_bank: FilterBank, bin_scaler: FrequencyBinScaler) -> Self {
        self.filter_bank = filter_bank;
        self.bin_scaler = bin_scaler;
        self
    }

    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    pub fn source(&self) -> &WaveSource {
        &self.source
    }

    pub fn wave(&self) -> &WaveData {
        &self.wave
    }

    pub fn sample_rate(&self) -> u32 {
        self.wave.sample_rate
    }

    /// Template bank; each channel runs on a fork of it
    pub fn filter_bank_mut(&mut self) -> &mut FilterBank {
        &mut self.filter_bank
    }

    pub fn bin_scaler_mut(&mut self) -> &mut FrequencyBinScaler {
        &mut self.bin_scaler
    }

    /// Filter every channel and return the result
    pub fn process(&mut self) -> Result<ProcessReport> {
        let driver = BlockStreamDriver::new(self.stream)?;
        let mut channels = Vec::with_capacity(self.wave.num_channels());
        let mut timings: BTreeMap<&'static str, TimingStats> = BTreeMap::new();

        for (index, samples) in self.wave.channels.iter().enumerate() {
            let _span = info_span!("channel", index).entered();
            let mut bank = self.filter_bank.fork();
            self.bin_scaler.reset();
            let scaler = &mut self.bin_scaler;

            let output = driver.process(
                samples,
                |block| bank.process_time_domain(block),
                |spectrum| scaler.process_frequency_domain(spectrum),
            )?;
            channels.push(output);

            for (operation, stats) in bank.drain_metrics() {
                timings.entry(operation).or_default().merge(&stats);
            }
        }
        self.bin_scaler.reset();
        for (operation, stats) in self.bin_scaler.drain_metrics() {
            timings.entry(operation).or_default().merge(&stats);
        }

        Ok(ProcessReport {
            wave: WaveData::new(self.wave.sample_rate, channels)?,
            timings,
        })
    }

    /// Filter every channel and write the result to `output`
    pub fn run(&mut self, output: &Path, bit_depth: u16) -> Result<ProcessReport> {
        let report = self.process()?;
        write_wave(output, &report.wave, bit_depth)?;
        info!(
            "processed {} channel(s), {:.2}s of audio -> {}",
            report.wave.num_channels(),
            report.wave.duration_secs(),
            output.display()
        );
        Ok(report)
    }
}
