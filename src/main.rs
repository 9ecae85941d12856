//! Wavefilter CLI
//!
//! Command-line interface for the wavefilter engine.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wavefilter::cli::commands::{self, ProcessOptions};
use wavefilter::cli::{Cli, Commands};
use wavefilter::config::StreamConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Wavefilter v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Process {
            input,
            output,
            config,
            block_size,
            overlap,
            zero_pad,
            bit_depth,
            timings,
        } => {
            let options = ProcessOptions {
                stream: StreamConfig {
                    block_size,
                    overlap_percent: overlap,
                    zero_pad,
                },
                bit_depth,
                timings,
            };
            commands::process(&input, &output, &config, options)
                .with_context(|| format!("failed to process {}", input.display()))
        }
        Commands::Inspect { config } => commands::inspect(&config)
            .with_context(|| format!("failed to inspect {}", config.display())),
    }
}
