//! Engine, stream and filter configuration
//!
//! `EngineConfig` and `StreamConfig` are plain values handed to
//! constructors. `FilterConfig` is the JSON form of a complete filter setup
//! used by the CLI; the coefficients themselves come from an external
//! designer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::{
    BinMapping, CascadeMemory, FilterBank, FilterSection, FrequencyBinScaler,
    FrequencyFilterEntry, ParallelEqDefinition,
};
use crate::error::{FilterError, Result};

/// Default block length in samples
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Default overlap between consecutive blocks, in percent
pub const DEFAULT_OVERLAP_PERCENT: u32 = 75;

/// Sample rate assumed for raw in-memory input
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Options shared by the filter engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Record per-call processing time
    #[serde(default)]
    pub collect_timings: bool,
}

/// Block slicing used by the stream driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame length of the frequency-domain path (even)
    pub block_size: usize,
    /// How much consecutive frames overlap, 0..100
    pub overlap_percent: u32,
    /// Pad the tail with one extra frame of silence
    pub zero_pad: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,
            zero_pad: false,
        }
    }
}

impl StreamConfig {
    pub fn new(block_size: usize, overlap_percent: u32) -> Self {
        Self {
            block_size,
            overlap_percent,
            ..Default::default()
        }
    }

    /// Samples between the starts of two consecutive frames
    pub fn hop_size(&self) -> usize {
        (self.block_size * (100 - self.overlap_percent.min(100)) as usize / 100).max(1)
    }

    /// Number of bins handed to the frequency-domain callback
    pub fn spectrum_len(&self) -> usize {
        self.block_size / 2 + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size < 2 || self.block_size % 2 != 0 {
            return Err(FilterError::InvalidStreamConfig {
                reason: format!("block size must be even and >= 2, got {}", self.block_size),
            });
        }
        if self.overlap_percent >= 100 {
            return Err(FilterError::InvalidStreamConfig {
                reason: format!(
                    "overlap must be below 100%, got {}%",
                    self.overlap_percent
                ),
            });
        }
        Ok(())
    }
}

/// Time-domain part of a filter configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeDomainConfig {
    #[default]
    None,
    Cascade {
        sections: Vec<FilterSection>,
        #[serde(default)]
        memory: CascadeMemory,
    },
    ParallelEq(ParallelEqDefinition),
}

/// Frequency-domain part of a filter configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrequencyDomainConfig {
    #[serde(default)]
    pub mapping: BinMapping,
    #[serde(default)]
    pub entries: Vec<FrequencyFilterEntry>,
}

/// A complete filter setup, as stored in a JSON file
///
/// ```json
/// {
///   "time_domain": { "mode": "parallel_eq", "rows": [[0.1, 0, -0.1, 1, -1.8, 0.9]], "bias": 1.0 },
///   "frequency_domain": { "mapping": { "offset": 0 }, "entries": [{ "bin_index": 3, "gain": 2.0 }] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub time_domain: TimeDomainConfig,
    #[serde(default)]
    pub frequency_domain: FrequencyDomainConfig,
}

impl FilterConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FilterError::FileNotFound {
                path: path.display().to_string(),
                source: None,
            });
        }
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a configured time-domain engine
    pub fn build_filter_bank(&self) -> Result<FilterBank> {
        let mut bank = FilterBank::new(self.engine);
        match &self.time_domain {
            TimeDomainConfig::None => {}
            TimeDomainConfig::Cascade { sections, memory } => {
                bank.set_cascade_memory(*memory)?;
                for section in sections {
                    bank.add_filter_section(section.clone())?;
                }
            }
            TimeDomainConfig::ParallelEq(definition) => {
                bank.configure_parallel_eq(definition.clone())?;
            }
        }
        Ok(bank)
    }

    /// Build a configured frequency-domain engine
    pub fn build_bin_scaler(&self) -> Result<FrequencyBinScaler> {
        let mut scaler = FrequencyBinScaler::new(self.engine, self.frequency_domain.mapping);
        for entry in &self.frequency_domain.entries {
            scaler.add_entry(*entry)?;
        }
        Ok(scaler)
    }
}
