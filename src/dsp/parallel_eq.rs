//! Parallel graphic equalizer
//!
//! A bank of IIR bands is evaluated on the same input sample, the band
//! outputs are summed and a direct path `bias * x` is added. This is the
//! parallel multi-band structure from "Efficient Multi-Band Digital Audio
//! Graphic Equalizer with Accurate Frequency Response Control".
//!
//! Each band row is laid out `[b0 .. b(n-1), a0 .. a(n-1)]`, numerator first.
//! The recursion never divides by `a0`, so rows must already be normalised.
//!
//! Coefficients are real only. Large gain/cutoff combinations are known to
//! make the loop unstable, and a non-zero bias lifts content below ~10 Hz.
//! Neither is corrected here; divergence is logged and passed through.

use log::warn;
use serde::{Deserialize, Serialize};

use super::section::{tdf2_step, DelayState, Stability};
use crate::error::{FilterError, Result};

const A0_TOLERANCE: f64 = 1e-12;

/// One band of the parallel bank
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelBand {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
}

impl ParallelBand {
    /// Split a `[b.., a..]` row into a band
    pub fn from_row(row: &[f64]) -> Result<Self> {
        if row.len() % 2 != 0 || row.len() < 4 {
            return Err(FilterError::InvalidCoefficients {
                reason: format!(
                    "band row must hold an even number (>= 4) of coefficients, got {}",
                    row.len()
                ),
            });
        }
        if row.iter().any(|c| !c.is_finite()) {
            return Err(FilterError::InvalidCoefficients {
                reason: "band coefficients must be finite".to_string(),
            });
        }

        let (numerator, denominator) = row.split_at(row.len() / 2);
        if (denominator[0] - 1.0).abs() > A0_TOLERANCE {
            return Err(FilterError::InvalidCoefficients {
                reason: format!(
                    "band denominator must be normalised (a0 = 1), got a0 = {}",
                    denominator[0]
                ),
            });
        }

        Ok(Self {
            numerator: numerator.to_vec(),
            denominator: denominator.to_vec(),
        })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    /// Taps per coefficient row
    pub fn taps(&self) -> usize {
        self.numerator.len()
    }

    pub fn stability(&self) -> Stability {
        Stability::of_denominator(&self.denominator)
    }
}

/// Coefficient tensor `[bands, {numerator, denominator}, taps]` plus bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition", into = "RawDefinition")]
pub struct ParallelEqDefinition {
    bands: Vec<ParallelBand>,
    bias: f64,
}

#[derive(Serialize, Deserialize)]
struct RawDefinition {
    rows: Vec<Vec<f64>>,
    #[serde(default)]
    bias: f64,
}

impl TryFrom<RawDefinition> for ParallelEqDefinition {
    type Error = FilterError;

    fn try_from(raw: RawDefinition) -> Result<Self> {
        ParallelEqDefinition::from_rows(&raw.rows, raw.bias)
    }
}

impl From<ParallelEqDefinition> for RawDefinition {
    fn from(definition: ParallelEqDefinition) -> Self {
        RawDefinition {
            rows: definition.rows(),
            bias: definition.bias,
        }
    }
}

impl ParallelEqDefinition {
    /// Build a definition from one `[b.., a..]` row per band
    ///
    /// # Errors
    /// * `InvalidCoefficients` - no rows, malformed row or non-finite bias
    /// * `ShapeMismatch` - rows of different length
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], bias: f64) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(FilterError::InvalidCoefficients {
                reason: "parallel EQ needs at least one band".to_string(),
            });
        };
        if !bias.is_finite() {
            return Err(FilterError::InvalidCoefficients {
                reason: "bias must be finite".to_string(),
            });
        }

        let row_len = first.as_ref().len();
        let mut bands = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != row_len {
                return Err(FilterError::shape(
                    format!("parallel EQ band {}", index),
                    format!("{} coefficients", row_len),
                    row.len(),
                ));
            }
            bands.push(ParallelBand::from_row(row)?);
        }

        Ok(Self { bands, bias })
    }

    pub fn bands(&self) -> &[ParallelBand] {
        &self.bands
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Taps per coefficient row, identical for every band
    pub fn taps(&self) -> usize {
        self.bands[0].taps()
    }

    /// Width of each band's delay row: `row_len / 2 - 1`
    pub fn delay_width(&self) -> usize {
        self.taps() - 1
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) -> Result<()> {
        if !bias.is_finite() {
            return Err(FilterError::InvalidCoefficients {
                reason: "bias must be finite".to_string(),
            });
        }
        self.bias = bias;
        Ok(())
    }

    /// Coefficients back in `[b.., a..]` row form
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.bands
            .iter()
            .map(|band| [band.numerator.as_slice(), band.denominator.as_slice()].concat())
            .collect()
    }
}

/// A parallel EQ definition bound to its persistent delay state
#[derive(Debug, Clone)]
pub struct ParallelGraphicEq {
    definition: ParallelEqDefinition,
    state: DelayState,
}

impl ParallelGraphicEq {
    /// Bind a definition to zeroed state of shape `[bands, taps - 1]`
    pub fn new(definition: ParallelEqDefinition) -> Self {
        for (index, band) in definition.bands.iter().enumerate() {
            if band.stability() == Stability::Unstable {
                warn!(
                    "parallel EQ band {} has poles outside the unit circle; output may diverge",
                    index
                );
            }
        }
        let state = DelayState::zeros(definition.band_count(), definition.delay_width());
        Self { definition, state }
    }

    /// Bind a definition to existing state, e.g. to resume a stream
    ///
    /// # Errors
    /// * `ShapeMismatch` - if the state shape is not `[bands, taps - 1]`
    pub fn resume(definition: ParallelEqDefinition, state: DelayState) -> Result<Self> {
        let expected = [definition.band_count(), definition.delay_width()];
        if state.shape() != expected {
            return Err(FilterError::shape(
                "parallel EQ delay state",
                format!("{:?}", expected),
                format!("{:?}", state.shape()),
            ));
        }
        Ok(Self { definition, state })
    }

    pub fn definition(&self) -> &ParallelEqDefinition {
        &self.definition
    }

    pub fn state(&self) -> &DelayState {
        &self.state
    }

    pub(crate) fn definition_mut(&mut self) -> &mut ParallelEqDefinition {
        &mut self.definition
    }

    /// Run the per-sample parallel recursion over `samples`
    ///
    /// Samples are processed strictly in order: each step reads the delay
    /// state written by the previous one.
    pub fn process(&mut self, samples: &[f64]) -> Vec<f64> {
        let bias = self.definition.bias;
        let mut output = Vec::with_capacity(samples.len());

        for &x in samples {
            let mut sum = 0.0;
            for (index, band) in self.definition.bands.iter().enumerate() {
                sum += tdf2_step(
                    &band.numerator,
                    &band.denominator,
                    self.state.row_mut(index),
                    x,
                );
            }
            output.push(sum + x * bias);
        }

        if output.iter().any(|y| !y.is_finite()) {
            warn!(
                "parallel EQ output is no longer finite ({} bands, bias {}); the coefficients are unstable",
                self.definition.band_count(),
                bias
            );
        }

        output
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Same definition, zeroed state
    pub fn fresh_copy(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            state: DelayState::zeros(self.state.shape()[0], self.state.shape()[1]),
        }
    }
}
