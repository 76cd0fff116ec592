//! Piecewise-linear paired data (damage functions)

use crate::error::InvalidCurveError;

/// A monotonic x/y curve sampled with linear interpolation
///
/// Values below the first abscissa are zero and values at or beyond the
/// last abscissa clamp to the last ordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedData {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl PairedData {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, InvalidCurveError> {
        if xs.len() != ys.len() {
            return Err(InvalidCurveError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(InvalidCurveError::Empty);
        }
        if let Some(index) = xs.iter().position(|x| !x.is_finite()) {
            return Err(InvalidCurveError::NotAscending { index });
        }
        if let Some(index) = xs.windows(2).position(|w| w[0] >= w[1]) {
            return Err(InvalidCurveError::NotAscending { index: index + 1 });
        }
        Ok(Self { xs, ys })
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always false: construction rejects empty curves
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Sample the curve at `x`
    pub fn sample(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        // NaN has no place on the curve
        if x.is_nan() || x < self.xs[0] {
            return 0.0;
        }
        if x == self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[last] {
            return self.ys[last];
        }

        // First index with xs[upper] >= x; x > xs[0] so upper >= 1
        let upper = self.xs.partition_point(|&v| v < x);
        if self.xs[upper] == x {
            return self.ys[upper];
        }
        let lower = upper - 1;
        let slope = (self.ys[upper] - self.ys[lower]) / (self.xs[upper] - self.xs[lower]);
        self.ys[lower] + slope * (x - self.xs[lower])
    }
}
