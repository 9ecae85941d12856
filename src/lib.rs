//! Wavefilter - block-streaming filter engine
//!
//! Two engines process audio delivered in fixed-size blocks:
//! 1. Time domain - an IIR cascade or a parallel graphic EQ, with delay
//!    state carried from one block to the next
//! 2. Frequency domain - per-bin gains applied to spectrum blocks
//!
//! # Architecture
//!
//! - `dsp`: the filter engines and their coefficient types
//! - `engine`: audio blocks, WAV I/O and the stream driver that feeds them
//! - `config`: engine, stream and JSON filter configuration
//! - `cli`: the `wavefilter-cli` command implementations

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use error::{FilterError, Result};
