//! CLI Command Implementations

use std::fmt::Write as _;
use std::path::Path;

use log::info;

use crate::config::{FilterConfig, StreamConfig};
use crate::dsp::{Stability, TimeDomainMode};
use crate::engine::WaveProcessor;
use crate::error::Result;

/// Options for `process` beyond the file paths
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub stream: StreamConfig,
    pub bit_depth: u16,
    pub timings: bool,
}

/// Filter `input` into `output` using the setup in `config`.
pub fn process(input: &Path, output: &Path, config: &Path, options: ProcessOptions) -> Result<()> {
    info!("Processing {} with {}", input.display(), config.display());

    let mut filter_config = FilterConfig::load(config)?;
    filter_config.engine.collect_timings |= options.timings;

    let mut processor = WaveProcessor::new(input, filter_config.engine)?
        .with_engines(
            filter_config.build_filter_bank()?,
            filter_config.build_bin_scaler()?,
        )
        .with_stream_config(options.stream);

    let report = processor.run(output, options.bit_depth)?;
    println!(
        "Wrote {} ({} channel(s), {} Hz, {:.2}s)",
        output.display(),
        report.wave.num_channels(),
        report.wave.sample_rate,
        report.wave.duration_secs()
    );

    if options.timings {
        for (operation, stats) in &report.timings {
            println!(
                "  {:<26} {:>8} calls  mean {:?}  last {:?}",
                operation, stats.calls, stats.mean, stats.last
            );
        }
    }
    Ok(())
}

/// Validate a configuration file and print what it sets up.
pub fn inspect(config: &Path) -> Result<()> {
    info!("Inspecting {}", config.display());
    let filter_config = FilterConfig::load(config)?;
    print!("{}", summarize(&filter_config)?);
    Ok(())
}

/// Human-readable description of a configuration
pub fn summarize(config: &FilterConfig) -> Result<String> {
    let bank = config.build_filter_bank()?;
    let scaler = config.build_bin_scaler()?;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Time domain: {}", bank.mode().name());
    match bank.mode() {
        TimeDomainMode::Unconfigured => {}
        TimeDomainMode::Cascade(cascade) => {
            let _ = writeln!(out, "  memory: {:?}", cascade.memory());
            for (i, section) in cascade.sections().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  section {}: {} taps, {}",
                    i,
                    section.taps(),
                    stability_label(section.stability())
                );
            }
        }
        TimeDomainMode::ParallelGraphicEq(eq) => {
            let definition = eq.definition();
            let _ = writeln!(out, "  bias: {}", definition.bias());
            for (i, band) in definition.bands().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  band {}: {} taps, {}",
                    i,
                    band.taps(),
                    stability_label(band.stability())
                );
            }
        }
    }

    let mapping = scaler.mapping();
    let _ = writeln!(
        out,
        "Frequency domain: {} entr{} (bin offset {})",
        scaler.entries().len(),
        if scaler.entries().len() == 1 { "y" } else { "ies" },
        mapping.offset
    );
    for entry in scaler.entries() {
        let _ = writeln!(
            out,
            "  bin {} -> {}: gain {}",
            entry.bin_index,
            mapping.resolve(entry.bin_index),
            entry.gain
        );
    }
    Ok(out)
}

fn stability_label(stability: Stability) -> &'static str {
    match stability {
        Stability::Stable => "stable",
        Stability::Unstable => "UNSTABLE",
        Stability::Unknown => "stability unknown",
    }
}
