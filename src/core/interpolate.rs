use crate::utils::error::{BcError, Result};

/// Piecewise-linear interpolant over strictly increasing knots.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearInterpolant {
    /// Builds the interpolant from `(x, y)` samples in any order.
    ///
    /// Fails on fewer than two samples, non-finite values or repeated `x`.
    pub fn new(samples: &[(f64, f64)]) -> Result<Self> {
        if samples.len() < 2 {
            return Err(BcError::profile(format!(
                "at least 2 samples are required, got {}",
                samples.len()
            )));
        }
        if let Some((x, y)) = samples.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(BcError::profile(format!("non-finite sample ({}, {})", x, y)));
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(BcError::profile(format!("duplicate radius {}", pair[0].0)));
        }

        let (xs, ys) = sorted.into_iter().unzip();
        Ok(Self { xs, ys })
    }

    pub fn min_x(&self) -> f64 {
        self.xs[0]
    }

    pub fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }

    /// Value at `x`, or `None` outside the knot range.
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        if !self.contains(x) {
            return None;
        }
        let last = self.xs.len() - 1;
        if x == self.xs[last] {
            return Some(self.ys[last]);
        }
        // xs[i] <= x < xs[i + 1]
        let i = self.xs.partition_point(|&k| k <= x) - 1;
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        Some(self.ys[i] + t * (self.ys[i + 1] - self.ys[i]))
    }

    /// Value at `x` with `x` first clamped into the knot range.
    pub fn evaluate_clamped(&self, x: f64) -> f64 {
        let x = x.clamp(self.min_x(), self.max_x());
        self.evaluate(x).unwrap_or(self.ys[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knots_are_reproduced_exactly() {
        // v(r) = 0.3 + 1.7 r
        let samples: Vec<(f64, f64)> = [0.0, 0.25, 0.5, 1.0, 2.0]
            .iter()
            .map(|&r| (r, 0.3 + 1.7 * r))
            .collect();
        let f = LinearInterpolant::new(&samples).unwrap();
        for (r, v) in &samples {
            assert_eq!(f.evaluate(*r), Some(*v));
        }
    }

    #[test]
    fn test_midpoints_are_linear() {
        let f = LinearInterpolant::new(&[(0.0, 0.0), (1.0, 2.0), (3.0, 0.0)]).unwrap();
        assert_eq!(f.evaluate(0.5), Some(1.0));
        assert_eq!(f.evaluate(2.0), Some(1.0));
    }

    #[test]
    fn test_unsorted_samples_are_sorted() {
        let f = LinearInterpolant::new(&[(2.0, 4.0), (0.0, 0.0), (1.0, 2.0)]).unwrap();
        assert_eq!(f.min_x(), 0.0);
        assert_eq!(f.max_x(), 2.0);
        assert_eq!(f.evaluate(1.5), Some(3.0));
    }

    #[test]
    fn test_out_of_range() {
        let f = LinearInterpolant::new(&[(0.0, 1.0), (1.0, 3.0)]).unwrap();
        assert_eq!(f.evaluate(-0.1), None);
        assert_eq!(f.evaluate(1.1), None);
        assert_eq!(f.evaluate_clamped(-5.0), 1.0);
        assert_eq!(f.evaluate_clamped(5.0), 3.0);
    }

    #[test]
    fn test_invalid_samples() {
        assert!(LinearInterpolant::new(&[(0.0, 1.0)]).is_err());
        assert!(LinearInterpolant::new(&[(0.0, 1.0), (0.0, 2.0)]).is_err());
        assert!(LinearInterpolant::new(&[(0.0, 1.0), (f64::NAN, 2.0)]).is_err());
    }
}
