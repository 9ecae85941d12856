//! CLI Module
//!
//! Command-line interface for running configured filters over WAV files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wavefilter - block-streaming IIR and spectral filtering for WAV files
#[derive(Parser, Debug)]
#[command(name = "wavefilter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter a WAV file with a JSON filter configuration
    #[command(name = "process")]
    Process {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Filter configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Frame length of the frequency-domain path
        #[arg(long, default_value_t = crate::config::DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Frame overlap in percent
        #[arg(long, default_value_t = crate::config::DEFAULT_OVERLAP_PERCENT)]
        overlap: u32,

        /// Pad the tail with one extra frame of silence
        #[arg(long)]
        zero_pad: bool,

        /// Output bit depth (16, 24 or 32)
        #[arg(long, default_value_t = 24)]
        bit_depth: u16,

        /// Print per-operation timings when done
        #[arg(long)]
        timings: bool,
    },

    /// Validate a filter configuration and print a summary
    #[command(name = "inspect")]
    Inspect {
        /// Filter configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}
