//! IIR filter sections and their delay state
//!
//! Sections are evaluated in transposed direct form II. For a section of
//! `n` taps the delay state holds `n - 1` cells:
//!
//! ```text
//! y       = b[0]*x + z[0]
//! z[i-1]  = b[i]*x - a[i]*y + z[i]      for i in 1..n-1
//! z[n-2]  = b[n-1]*x - a[n-1]*y
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Closed-form stability verdict for a denominator polynomial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    /// All poles strictly inside the unit circle
    Stable,
    /// At least one pole on or outside the unit circle
    Unstable,
    /// Order too high for the closed-form check
    Unknown,
}

impl Stability {
    /// Check a denominator already normalised so that `a[0] == 1`
    ///
    /// Trailing zero coefficients (padding) do not count towards the order.
    pub fn of_denominator(a: &[f64]) -> Self {
        let order = a.iter().rposition(|&c| c != 0.0).map_or(0, |last| last + 1);
        match &a[..order] {
            [] | [_] => Stability::Stable,
            [_, a1] => {
                if a1.abs() < 1.0 {
                    Stability::Stable
                } else {
                    Stability::Unstable
                }
            }
            [_, a1, a2] => {
                // Jury criterion for z^2 + a1 z + a2
                if a2.abs() < 1.0 && a1.abs() < 1.0 + a2 {
                    Stability::Stable
                } else {
                    Stability::Unstable
                }
            }
            _ => Stability::Unknown,
        }
    }
}

/// One IIR section in cascade form
///
/// Coefficients are stored normalised by `denominator[0]` and zero-padded to
/// a common length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSection", into = "RawSection")]
pub struct FilterSection {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawSection {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
}

impl TryFrom<RawSection> for FilterSection {
    type Error = FilterError;

    fn try_from(raw: RawSection) -> Result<Self> {
        FilterSection::new(raw.numerator, raw.denominator)
    }
}

impl From<FilterSection> for RawSection {
    fn from(section: FilterSection) -> Self {
        RawSection {
            numerator: section.numerator,
            denominator: section.denominator,
        }
    }
}

impl FilterSection {
    /// Create a section from numerator (b) and denominator (a) coefficients
    ///
    /// # Errors
    /// * `InvalidCoefficients` - if either vector is empty, `a[0]` is zero
    ///   or any coefficient is not finite
    pub fn new(numerator: Vec<f64>, denominator: Vec<f64>) -> Result<Self> {
        if numerator.is_empty() || denominator.is_empty() {
            return Err(FilterError::InvalidCoefficients {
                reason: "numerator and denominator must not be empty".to_string(),
            });
        }
        if numerator.iter().chain(&denominator).any(|c| !c.is_finite()) {
            return Err(FilterError::InvalidCoefficients {
                reason: "coefficients must be finite".to_string(),
            });
        }
        let a0 = denominator[0];
        if a0 == 0.0 {
            return Err(FilterError::InvalidCoefficients {
                reason: "leading denominator coefficient must be non-zero".to_string(),
            });
        }

        let taps = numerator.len().max(denominator.len());
        let mut b: Vec<f64> = numerator.iter().map(|c| c / a0).collect();
        let mut a: Vec<f64> = denominator.iter().map(|c| c / a0).collect();
        b.resize(taps, 0.0);
        a.resize(taps, 0.0);

        Ok(Self {
            numerator: b,
            denominator: a,
        })
    }

    /// The identity section: b = [1], a = [1]
    pub fn passthrough() -> Self {
        Self {
            numerator: vec![1.0],
            denominator: vec![1.0],
        }
    }

    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    /// Number of taps per coefficient vector after padding
    pub fn taps(&self) -> usize {
        self.numerator.len()
    }

    /// Number of delay cells this section needs
    pub fn delay_len(&self) -> usize {
        self.taps() - 1
    }

    pub fn stability(&self) -> Stability {
        Stability::of_denominator(&self.denominator)
    }

    /// Filter `samples` starting from the delay cells in `zi`
    ///
    /// `zi` is updated to the state after the last sample.
    pub fn filter(&self, samples: &[f64], zi: &mut [f64]) -> Vec<f64> {
        assert_eq!(
            zi.len(),
            self.delay_len(),
            "delay state does not match section order"
        );
        samples
            .iter()
            .map(|&x| tdf2_step(&self.numerator, &self.denominator, zi, x))
            .collect()
    }
}

/// Advance one transposed direct form II step and return the output
///
/// `a[0]` is assumed to be 1 and is never read. `zi.len()` must be
/// `b.len() - 1`.
#[inline]
pub(crate) fn tdf2_step(b: &[f64], a: &[f64], zi: &mut [f64], x: f64) -> f64 {
    let n = b.len();
    debug_assert_eq!(zi.len() + 1, n);
    if n == 1 {
        return b[0] * x;
    }

    let y = zi[0] + b[0] * x;
    for tap in 1..n - 1 {
        zi[tap - 1] = x * b[tap] - y * a[tap] + zi[tap];
    }
    zi[n - 2] = x * b[n - 1] - y * a[n - 1];
    y
}

/// Per-filter delay memory, `bands` rows of `width` cells
///
/// Row-major. This is the only state carried from one block to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayState {
    bands: usize,
    width: usize,
    cells: Vec<f64>,
}

impl DelayState {
    /// Zeroed state of shape `[bands, width]`
    pub fn zeros(bands: usize, width: usize) -> Self {
        Self {
            bands,
            width,
            cells: vec![0.0; bands * width],
        }
    }

    /// `[bands, width]`
    pub fn shape(&self) -> [usize; 2] {
        [self.bands, self.width]
    }

    pub fn row(&self, band: usize) -> &[f64] {
        &self.cells[band * self.width..(band + 1) * self.width]
    }

    pub fn row_mut(&mut self, band: usize) -> &mut [f64] {
        &mut self.cells[band * self.width..(band + 1) * self.width]
    }

    pub fn is_zero(&self) -> bool {
        self.cells.iter().all(|&c| c == 0.0)
    }

    pub fn reset(&mut self) {
        self.cells.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_section_normalises_by_a0() {
        let section = FilterSection::new(vec![2.0, 4.0], vec![2.0, -1.0]).unwrap();
        assert_eq!(section.numerator(), &[1.0, 2.0]);
        assert_eq!(section.denominator(), &[1.0, -0.5]);
    }

    #[test]
    fn test_section_pads_shorter_vector() {
        let section = FilterSection::new(vec![0.5], vec![1.0, -0.5, 0.25]).unwrap();
        assert_eq!(section.numerator(), &[0.5, 0.0, 0.0]);
        assert_eq!(section.delay_len(), 2);
    }

    #[test]
    fn test_section_rejects_invalid_coefficients() {
        assert!(FilterSection::new(vec![], vec![1.0]).is_err());
        assert!(FilterSection::new(vec![1.0], vec![0.0, 1.0]).is_err());
        assert!(FilterSection::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_first_order_impulse_response() {
        // y[n] = x[n] + 0.5 y[n-1]
        let section = FilterSection::new(vec![1.0], vec![1.0, -0.5]).unwrap();
        let mut zi = vec![0.0; section.delay_len()];
        let out = section.filter(&[1.0, 0.0, 0.0, 0.0], &mut zi);

        for (n, y) in out.iter().enumerate() {
            assert_relative_eq!(*y, 0.5_f64.powi(n as i32), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_second_order_matches_difference_equation() {
        let b = [0.2, 0.3, 0.1];
        let a = [1.0, -0.4, 0.2];
        let section = FilterSection::new(b.to_vec(), a.to_vec()).unwrap();
        let input: Vec<f64> = (0..32).map(|n| ((n * 7) % 5) as f64 - 2.0).collect();

        let mut zi = vec![0.0; 2];
        let out = section.filter(&input, &mut zi);

        let mut expected = vec![0.0; input.len()];
        for n in 0..input.len() {
            let x = |k: usize| if n >= k { input[n - k] } else { 0.0 };
            let y = |k: usize| if n >= k { expected[n - k] } else { 0.0 };
            let value = b[0] * x(0) + b[1] * x(1) + b[2] * x(2) - a[1] * y(1) - a[2] * y(2);
            expected[n] = value;
        }

        for (got, want) in out.iter().zip(&expected) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_stability_verdicts() {
        assert_eq!(Stability::of_denominator(&[1.0, -0.5]), Stability::Stable);
        assert_eq!(Stability::of_denominator(&[1.0, -1.5]), Stability::Unstable);
        assert_eq!(Stability::of_denominator(&[1.0, -1.2, 0.5]), Stability::Stable);
        assert_eq!(Stability::of_denominator(&[1.0, 0.0, 1.0]), Stability::Unstable);
        assert_eq!(
            Stability::of_denominator(&[1.0, 0.1, 0.1, 0.1]),
            Stability::Unknown
        );
    }

    #[test]
    fn test_padded_denominator_keeps_its_order() {
        let unstable = FilterSection::new(vec![0.1, 0.2, 0.3, 0.4], vec![1.0, -1.5]).unwrap();
        assert_eq!(unstable.denominator(), &[1.0, -1.5, 0.0, 0.0]);
        assert_eq!(unstable.stability(), Stability::Unstable);

        let stable = FilterSection::new(vec![0.2, 0.3, 0.1, 0.05], vec![1.0, -1.2, 0.5]).unwrap();
        assert_eq!(stable.stability(), Stability::Stable);

        let fir = FilterSection::new(vec![0.25, 0.5, 0.25], vec![1.0]).unwrap();
        assert_eq!(fir.stability(), Stability::Stable);
    }

    #[test]
    fn test_delay_state_rows() {
        let mut state = DelayState::zeros(3, 2);
        assert_eq!(state.shape(), [3, 2]);
        state.row_mut(1)[0] = 4.0;
        assert_eq!(state.row(1), &[4.0, 0.0]);
        assert!(!state.is_zero());
        state.reset();
        assert!(state.is_zero());
    }
}
