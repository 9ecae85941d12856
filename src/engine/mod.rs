//! Audio Engine Module
//!
//! Everything around the filters:
//! - Block types passed to the engines
//! - WAV file I/O
//! - The block stream driver and whole-file processor

pub mod block;
pub mod io;
pub mod processor;
pub mod stream;

pub use block::{AudioBlock, SpectrumBlock};
pub use io::{read_wave, write_wave, WaveData, WaveSource};
pub use processor::{ProcessReport, WaveProcessor};
pub use stream::BlockStreamDriver;
