//! Time-domain filter engine
//!
//! A [`FilterBank`] is either unconfigured (identity), a cascade of IIR
//! sections, or a parallel graphic EQ. The mode is fixed by the first
//! mutator call and the whole configuration is frozen once the first block
//! has been processed, so coefficient and delay-state shapes can never drift
//! apart mid-stream.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use log::{debug, trace};

use super::cascade::{CascadeFilter, CascadeMemory};
use super::metrics::{MetricsCollector, TimingCollector, TimingStats};
use super::parallel_eq::{ParallelEqDefinition, ParallelGraphicEq};
use super::section::FilterSection;
use crate::config::EngineConfig;
use crate::engine::AudioBlock;
use crate::error::{FilterError, Result};

/// Operation name used for time-domain timings
pub const TIME_DOMAIN_OPERATION: &str = "process_time_domain";

/// How the time-domain path evaluates its filters
#[derive(Debug, Clone, Default)]
pub enum TimeDomainMode {
    /// No filters; blocks pass through untouched
    #[default]
    Unconfigured,
    /// Sections applied one after another
    Cascade(CascadeFilter),
    /// Bands evaluated side by side and summed
    ParallelGraphicEq(ParallelGraphicEq),
}

impl TimeDomainMode {
    pub fn name(&self) -> &'static str {
        match self {
            TimeDomainMode::Unconfigured => "unconfigured",
            TimeDomainMode::Cascade(_) => "cascade",
            TimeDomainMode::ParallelGraphicEq(_) => "parallel_eq",
        }
    }
}

/// Owns the time-domain filters of one stream and their delay state
///
/// One instance per channel: the delay state is never shared.
///
/// # Example
/// ```
/// use wavefilter::config::EngineConfig;
/// use wavefilter::dsp::{FilterBank, FilterSection};
/// use wavefilter::engine::AudioBlock;
///
/// let mut bank = FilterBank::new(EngineConfig::default());
/// bank.add_filter_section(FilterSection::new(vec![0.5], vec![1.0, -0.5]).unwrap())
///     .unwrap();
///
/// let out = bank.process_time_domain(&AudioBlock::mono(0, vec![1.0, 0.0])).unwrap();
/// assert_eq!(out.samples(), &[0.5, 0.25]);
/// ```
pub struct FilterBank {
    mode: TimeDomainMode,
    cascade_memory: CascadeMemory,
    config: EngineConfig,
    metrics: Option<Box<dyn TimingCollector>>,
    streaming: bool,
}

impl FilterBank {
    /// Create an unconfigured bank
    pub fn new(config: EngineConfig) -> Self {
        let metrics: Option<Box<dyn TimingCollector>> = if config.collect_timings {
            Some(Box::new(MetricsCollector::new()))
        } else {
            None
        };
        Self {
            mode: TimeDomainMode::Unconfigured,
            cascade_memory: CascadeMemory::default(),
            config,
            metrics,
            streaming: false,
        }
    }

    /// Create an unconfigured bank reporting timings to `collector`
    ///
    /// The collector only receives data when `config.collect_timings` is set.
    pub fn with_collector(config: EngineConfig, collector: Box<dyn TimingCollector>) -> Self {
        let mut bank = Self::new(config);
        if config.collect_timings {
            bank.metrics = Some(collector);
        }
        bank
    }

    pub fn mode(&self) -> &TimeDomainMode {
        &self.mode
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.mode, TimeDomainMode::Unconfigured)
    }

    /// True once a block went through a configured bank
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Append a cascade section and allocate its delay state
    ///
    /// # Errors
    /// * `ModeConflict` - if a parallel EQ is configured
    /// * `ConfigurationLocked` - if streaming already started
    pub fn add_filter_section(&mut self, section: FilterSection) -> Result<()> {
        self.ensure_unlocked("add_filter_section")?;

        match &mut self.mode {
            TimeDomainMode::Unconfigured => {
                let mut cascade = CascadeFilter::new(self.cascade_memory);
                cascade.push(section);
                self.mode = TimeDomainMode::Cascade(cascade);
            }
            TimeDomainMode::Cascade(cascade) => cascade.push(section),
            TimeDomainMode::ParallelGraphicEq(_) => {
                return Err(FilterError::ModeConflict {
                    requested: "cascade",
                    active: "parallel_eq",
                })
            }
        }

        debug!("cascade section added ({} total)", self.section_count());
        Ok(())
    }

    /// Install the parallel EQ definition with zeroed `[bands, taps - 1]` state
    ///
    /// A second call before streaming replaces the definition.
    ///
    /// # Errors
    /// * `ModeConflict` - if cascade sections are configured
    /// * `ConfigurationLocked` - if streaming already started
    pub fn configure_parallel_eq(&mut self, definition: ParallelEqDefinition) -> Result<()> {
        self.ensure_unlocked("configure_parallel_eq")?;

        if let TimeDomainMode::Cascade(_) = self.mode {
            return Err(FilterError::ModeConflict {
                requested: "parallel_eq",
                active: "cascade",
            });
        }

        debug!(
            "parallel EQ configured: {} bands, {} taps, bias {}",
            definition.band_count(),
            definition.taps(),
            definition.bias()
        );
        self.mode = TimeDomainMode::ParallelGraphicEq(ParallelGraphicEq::new(definition));
        Ok(())
    }

    /// Set the direct-path bias of the configured parallel EQ
    ///
    /// # Errors
    /// * `ModeConflict` - if no parallel EQ is configured
    /// * `ConfigurationLocked` - if streaming already started
    /// * `InvalidCoefficients` - if `bias` is not finite
    pub fn set_bias(&mut self, bias: f64) -> Result<()> {
        self.ensure_unlocked("set_bias")?;

        match &mut self.mode {
            TimeDomainMode::ParallelGraphicEq(eq) => eq.definition_mut().set_bias(bias),
            other => Err(FilterError::ModeConflict {
                requested: "bias",
                active: other.name(),
            }),
        }
    }

    /// Choose whether cascade sections keep state across blocks
    pub fn set_cascade_memory(&mut self, memory: CascadeMemory) -> Result<()> {
        self.ensure_unlocked("set_cascade_memory")?;

        self.cascade_memory = memory;
        if let TimeDomainMode::Cascade(cascade) = &mut self.mode {
            cascade.set_memory(memory);
        }
        Ok(())
    }

    /// Apply the configured time-domain filters to a mono block
    ///
    /// An unconfigured bank returns a copy of `block`. Otherwise the result
    /// keeps the block's sequence counter and carries the filtered samples.
    ///
    /// # Errors
    /// * `ChannelMismatch` - if a configured bank receives a multi-channel block
    pub fn process_time_domain(&mut self, block: &AudioBlock) -> Result<AudioBlock> {
        let started = Instant::now();

        let samples = match &mut self.mode {
            TimeDomainMode::Unconfigured => None,
            _ if block.num_channels() != 1 => {
                return Err(FilterError::ChannelMismatch {
                    expected: 1,
                    actual: block.num_channels(),
                })
            }
            TimeDomainMode::Cascade(cascade) => Some(cascade.process(block.samples())),
            TimeDomainMode::ParallelGraphicEq(eq) => Some(eq.process(block.samples())),
        };

        let output = match samples {
            Some(samples) => {
                self.streaming = true;
                block.derive(block.sequence(), samples)
            }
            None => block.clone(),
        };

        trace!(
            "time-domain block {} ({} samples, {})",
            block.sequence(),
            block.len(),
            self.mode.name()
        );
        if let Some(metrics) = &mut self.metrics {
            metrics.record(TIME_DOMAIN_OPERATION, started.elapsed());
        }

        Ok(output)
    }

    /// Zero all delay state and reopen configuration for a new stream
    pub fn reset(&mut self) {
        match &mut self.mode {
            TimeDomainMode::Unconfigured => {}
            TimeDomainMode::Cascade(cascade) => cascade.reset(),
            TimeDomainMode::ParallelGraphicEq(eq) => eq.reset(),
        }
        self.streaming = false;
    }

    /// An identically configured bank with its own zeroed state
    ///
    /// Used to give every channel of a stream an independent engine.
    pub fn fork(&self) -> Self {
        let mut bank = Self::new(self.config);
        bank.metrics = self.metrics.as_ref().map(|metrics| metrics.fork());
        bank.cascade_memory = self.cascade_memory;
        bank.mode = match &self.mode {
            TimeDomainMode::Unconfigured => TimeDomainMode::Unconfigured,
            TimeDomainMode::Cascade(cascade) => TimeDomainMode::Cascade(cascade.fresh_copy()),
            TimeDomainMode::ParallelGraphicEq(eq) => {
                TimeDomainMode::ParallelGraphicEq(eq.fresh_copy())
            }
        };
        bank
    }

    /// Return collected timings and reset the collector
    pub fn drain_metrics(&mut self) -> BTreeMap<&'static str, TimingStats> {
        self.metrics
            .as_mut()
            .map(|metrics| metrics.drain())
            .unwrap_or_default()
    }

    fn section_count(&self) -> usize {
        match &self.mode {
            TimeDomainMode::Cascade(cascade) => cascade.len(),
            _ => 0,
        }
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<()> {
        if self.streaming {
            return Err(FilterError::ConfigurationLocked { operation });
        }
        Ok(())
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for FilterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBank")
            .field("mode", &self.mode)
            .field("cascade_memory", &self.cascade_memory)
            .field("config", &self.config)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}
