use std::f64::consts::PI;

/// Symmetric Gaussian blur taps.
///
/// `offsets[i] = (i - (taps - 1) / 2) * spacing`; weights follow the standard
/// normal density at each offset, rescaled to sum to one. Both blur axes use
/// the same scalar offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    offsets: Vec<f32>,
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Computes `taps` offsets and normalized weights.
    ///
    /// Accumulation runs in `f64` so the `f32` weights sum to one within
    /// single-precision rounding.
    pub fn compute(taps: usize, spacing: f32) -> Self {
        let center = (taps as f64 - 1.0) * 0.5;
        let spacing = spacing as f64;

        let offsets: Vec<f64> = (0..taps)
            .map(|i| (i as f64 - center) * spacing)
            .collect();

        let density: Vec<f64> = offsets
            .iter()
            .map(|p| (-p * p / 2.0).exp() / (2.0 * PI).sqrt())
            .collect();
        let total: f64 = density.iter().sum();

        Self {
            offsets: offsets.iter().map(|&p| p as f32).collect(),
            weights: density.iter().map(|&w| (w / total) as f32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns `(offset, weight)` of tap `i`.
    pub fn tap(&self, i: usize) -> Option<(f32, f32)> {
        Some((*self.offsets.get(i)?, *self.weights.get(i)?))
    }
}
