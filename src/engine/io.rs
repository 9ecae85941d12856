//! Waveform input and output
//!
//! Input is either a WAV file or a raw sample sequence. WAV samples of
//! any supported integer width are scaled to [-1, 1) and stored as `f64`,
//! one vector per channel.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use serde_json::Value;

use crate::config::DEFAULT_SAMPLE_RATE;
use crate::error::{FilterError, Result};

/// Decoded audio: sample rate plus de-interleaved channels
#[derive(Debug, Clone, PartialEq)]
pub struct WaveData {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f64>>,
}

impl WaveData {
    /// Create from channels of equal length
    pub fn new(sample_rate: u32, channels: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(FilterError::InvalidAudio {
                reason: "audio has no channels".to_string(),
                source: None,
            });
        };
        let frames = first.len();
        if let Some(ragged) = channels.iter().position(|ch| ch.len() != frames) {
            return Err(FilterError::shape(
                format!("channel {}", ragged),
                format!("{} frames", frames),
                channels[ragged].len(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn mono(sample_rate: u32, samples: Vec<f64>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }
}

/// Where the samples to filter come from
#[derive(Debug, Clone, PartialEq)]
pub enum WaveSource {
    /// A WAV file; its own sample rate is used
    Path(PathBuf),
    /// Raw mono samples at [`DEFAULT_SAMPLE_RATE`]
    Samples(Vec<f64>),
}

impl WaveSource {
    /// Read or wrap the samples
    pub fn load(&self) -> Result<WaveData> {
        match self {
            WaveSource::Path(path) => read_wave(path),
            WaveSource::Samples(samples) => Ok(WaveData::mono(DEFAULT_SAMPLE_RATE, samples.clone())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            WaveSource::Path(path) => Some(path),
            WaveSource::Samples(_) => None,
        }
    }
}

impl From<PathBuf> for WaveSource {
    fn from(path: PathBuf) -> Self {
        WaveSource::Path(path)
    }
}

impl From<&Path> for WaveSource {
    fn from(path: &Path) -> Self {
        WaveSource::Path(path.to_path_buf())
    }
}

impl From<&str> for WaveSource {
    fn from(path: &str) -> Self {
        WaveSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<f64>> for WaveSource {
    fn from(samples: Vec<f64>) -> Self {
        WaveSource::Samples(samples)
    }
}

impl From<&[f64]> for WaveSource {
    fn from(samples: &[f64]) -> Self {
        WaveSource::Samples(samples.to_vec())
    }
}

/// Dynamic input: a string is a path, an array of numbers is raw samples
impl TryFrom<Value> for WaveSource {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(path) => Ok(WaveSource::Path(PathBuf::from(path))),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.as_f64().ok_or_else(|| FilterError::InvalidInput {
                        reason: format!("sample {} is not a number: {}", index, item),
                    })
                })
                .collect::<Result<Vec<f64>>>()
                .map(WaveSource::Samples),
            other => Err(FilterError::InvalidInput {
                reason: format!(
                    "input must be a file path or a sample array, got {}",
                    value_kind(&other)
                ),
            }),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a WAV file into de-interleaved `f64` channels
///
/// # Errors
/// * `FileNotFound` - if the file does not exist
/// * `InvalidAudio` - if the file is not a valid WAV file
/// * `UnsupportedFormat` - for integer widths other than 8/16/24/32 bits
pub fn read_wave(path: &Path) -> Result<WaveData> {
    if !path.exists() {
        return Err(FilterError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| FilterError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(FilterError::InvalidAudio {
            reason: "WAV header declares zero channels".to_string(),
            source: None,
        });
    }

    let interleaved = read_samples_as_f64(reader, spec.bits_per_sample, spec.sample_format)?;
    debug!(
        "read {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        spec.sample_rate,
        channels,
        interleaved.len()
    );

    WaveData::new(spec.sample_rate, deinterleave(&interleaved, channels))
}

/// Write channels to a WAV file
///
/// `bit_depth` 16 and 24 write integer PCM, 32 writes IEEE float. Integer
/// output uses the same full-scale factor as `read_wave`, so values on the
/// integer grid survive a round trip unchanged; `1.0` clips to the largest
/// positive code.
pub fn write_wave(path: &Path, data: &WaveData, bit_depth: u16) -> Result<()> {
    let spec = WavSpec {
        channels: data.num_channels() as u16,
        sample_rate: data.sample_rate,
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;
    let interleaved = interleave(&data.channels);

    match bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388608.0).round().clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(write_error)?;
            }
        }
        32 => {
            for sample in interleaved {
                writer.write_sample(sample as f32).map_err(write_error)?;
            }
        }
        _ => {
            return Err(FilterError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
            });
        }
    }

    writer.finalize().map_err(write_error)?;
    debug!("wrote {} ({} frames)", path.display(), data.num_frames());
    Ok(())
}

fn write_error(e: hound::Error) -> FilterError {
    match e {
        hound::Error::IoError(io) => FilterError::Io(io),
        other => FilterError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read samples from WAV reader and convert to f64
fn read_samples_as_f64<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f64>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => {
            return reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| FilterError::InvalidAudio {
                    reason: format!("Failed to read float samples: {}", e),
                    source: Some(Box::new(e)),
                });
        }
        (SampleFormat::Int, 8) => 128.0,
        (SampleFormat::Int, 16) => 32768.0,
        (SampleFormat::Int, 24) => 8388608.0,
        (SampleFormat::Int, 32) => 2147483648.0,
        (SampleFormat::Int, bits) => {
            return Err(FilterError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits),
            })
        }
    };

    // hound widens every integer width into i32
    reader
        .samples::<i32>()
        .map(|s| s.map(|v| v as f64 / scale))
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|e| FilterError::InvalidAudio {
            reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
            source: Some(Box::new(e)),
        })
}

/// De-interleave samples from [L,R,L,R,...] to [[L,L,...], [R,R,...]]
fn deinterleave(samples: &[f64], channels: usize) -> Vec<Vec<f64>> {
    let frames = samples.len() / channels;
    let mut result = vec![Vec::with_capacity(frames); channels];

    for (i, sample) in samples.iter().take(frames * channels).enumerate() {
        result[i % channels].push(*sample);
    }

    result
}

/// Interleave channels from [[L,L,...], [R,R,...]] to [L,R,L,R,...]
fn interleave(channels: &[Vec<f64>]) -> Vec<f64> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut result = Vec::with_capacity(frames * channels.len());

    for frame in 0..frames {
        for channel in channels {
            result.push(channel[frame]);
        }
    }

    result
}
