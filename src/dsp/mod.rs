//! Filter engines
//!
//! Time-domain filtering runs either as a cascade of IIR sections or as a
//! parallel graphic EQ; `FilterBank` owns whichever mode is configured.
//! Frequency-domain filtering scales individual bins of a spectrum block.

mod bank;
mod bin_scaler;
mod cascade;
mod metrics;
mod parallel_eq;
mod section;

pub use bank::{FilterBank, TimeDomainMode, TIME_DOMAIN_OPERATION};
pub use bin_scaler::{BinMapping, FrequencyBinScaler, FrequencyFilterEntry, FREQUENCY_DOMAIN_OPERATION};
pub use cascade::{CascadeFilter, CascadeMemory};
pub use metrics::{MetricsCollector, TimingCollector, TimingStats};
pub use parallel_eq::{ParallelBand, ParallelEqDefinition, ParallelGraphicEq};
pub use section::{DelayState, FilterSection, Stability};
