//! `XySequence`: an ordered, strictly monotone x-axis paired with a mutable
//! y-axis of equal length.
//!
//! Curves are computed in natural-log-x space; conversion to linear-x only
//! happens at export (§3 invariants). The x-axis is shared (via `Arc`)
//! across every curve derived from the same model so fan-in reductions
//! never have to re-validate alignment.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An immutable, strictly monotone x-axis shared across curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XySequence {
    x: Arc<[f64]>,
    y: Vec<f64>,
}

impl XySequence {
    /// Build a sequence from strictly monotone increasing x-values and
    /// matching y-values.
    ///
    /// # Panics
    ///
    /// Panics if `x` and `y` differ in length, `x` has fewer than one
    /// element, or `x` is not strictly increasing. These are programmer
    /// errors (mismatched model curves), not recoverable runtime conditions.
    #[must_use]
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "XySequence: x/y length mismatch");
        assert!(!x.is_empty(), "XySequence: empty x-axis");
        assert!(
            x.windows(2).all(|w| w[0] < w[1]),
            "XySequence: x-axis must be strictly increasing"
        );
        Self {
            x: Arc::from(x),
            y,
        }
    }

    /// Build a zero-filled sequence sharing the x-axis of `template`.
    #[must_use]
    pub fn zeros_like(template: &XySequence) -> Self {
        Self {
            x: Arc::clone(&template.x),
            y: vec![0.0; template.x.len()],
        }
    }

    /// The shared x-axis.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The mutable y-axis.
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the sequence has no points (never true for a validly
    /// constructed sequence, provided for API symmetry).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Two sequences share the same x-axis allocation or have identical
    /// x-values; this is the alignment check fan-in reductions rely on.
    #[must_use]
    pub fn same_x_as(&self, other: &XySequence) -> bool {
        Arc::ptr_eq(&self.x, &other.x) || self.x.as_ref() == other.x.as_ref()
    }

    /// In-place pointwise add: `self.y[i] += other.y[i]`.
    ///
    /// # Panics
    ///
    /// Panics if the x-axes differ (addition is only defined for curves
    /// derived from the same model).
    pub fn add(&mut self, other: &XySequence) -> &mut Self {
        assert!(self.same_x_as(other), "XySequence::add: x-axis mismatch");
        for (a, b) in self.y.iter_mut().zip(other.y.iter()) {
            *a += b;
        }
        self
    }

    /// In-place pointwise multiply by a scalar.
    pub fn multiply(&mut self, scalar: f64) -> &mut Self {
        for v in &mut self.y {
            *v *= scalar;
        }
        self
    }

    /// In-place pointwise multiply by another sequence's y-values.
    ///
    /// # Panics
    ///
    /// Panics if the x-axes differ.
    pub fn multiply_seq(&mut self, other: &XySequence) -> &mut Self {
        assert!(
            self.same_x_as(other),
            "XySequence::multiply_seq: x-axis mismatch"
        );
        for (a, b) in self.y.iter_mut().zip(other.y.iter()) {
            *a *= b;
        }
        self
    }

    /// In-place complement: `y[i] = 1 - y[i]`.
    pub fn complement(&mut self) -> &mut Self {
        for v in &mut self.y {
            *v = 1.0 - *v;
        }
        self
    }

    /// A defensive, mutable copy sharing the same x-axis allocation.
    #[must_use]
    pub fn copy(&self) -> XySequence {
        XySequence {
            x: Arc::clone(&self.x),
            y: self.y.clone(),
        }
    }

    /// An immutable view; identical representation to [`XySequence::copy`]
    /// but named to match the §3 vocabulary of "mutable vs immutable copy".
    #[must_use]
    pub fn immutable_copy(&self) -> XySequence {
        self.copy()
    }

    /// Mutable access to the y-axis for callers building up a curve
    /// point-by-point (e.g. exceedance model evaluation).
    pub fn y_mut(&mut self) -> &mut [f64] {
        &mut self.y
    }

    /// Linear interpolation of y at a given x (the curve is assumed
    /// monotone in y for the direction the caller cares about; this
    /// function does no monotonicity enforcement itself). Returns `None`
    /// if `x0` is outside the sequence's x-range.
    #[must_use]
    pub fn interpolate_y(&self, x0: f64) -> Option<f64> {
        if x0 < self.x[0] || x0 > self.x[self.x.len() - 1] {
            return None;
        }
        let idx = self.x.partition_point(|&x| x <= x0);
        if idx == 0 {
            return Some(self.y[0]);
        }
        if idx >= self.x.len() {
            return Some(self.y[self.y.len() - 1]);
        }
        let (x_lo, x_hi) = (self.x[idx - 1], self.x[idx]);
        let (y_lo, y_hi) = (self.y[idx - 1], self.y[idx]);
        if (x_hi - x_lo).abs() < f64::EPSILON {
            return Some(y_lo);
        }
        let t = (x0 - x_lo) / (x_hi - x_lo);
        Some(y_lo + t * (y_hi - y_lo))
    }

    /// Interpolate the x-value at a given y, assuming y is monotone
    /// decreasing in x (the hazard-curve convention: rate decreases as IML
    /// increases) and treating y as log-space for the interpolation, as
    /// required by the deaggregation-target lookup (§4.5, §8 scenario 6).
    /// Returns `None` if `y0` is outside the curve's y-range.
    #[must_use]
    pub fn interpolate_x_log_y(&self, y0: f64) -> Option<f64> {
        if y0 <= 0.0 {
            return None;
        }
        let n = self.y.len();
        if n < 2 {
            return None;
        }
        // y is expected to be non-increasing; find the bracketing segment.
        for i in 0..n - 1 {
            let (y_hi, y_lo) = (self.y[i], self.y[i + 1]);
            let within = (y0 <= y_hi && y0 >= y_lo) || (y0 >= y_hi && y0 <= y_lo);
            if within && y_hi > 0.0 && y_lo > 0.0 {
                let (x_lo, x_hi) = (self.x[i], self.x[i + 1]);
                if (y_hi - y_lo).abs() < f64::EPSILON {
                    return Some(x_lo);
                }
                let t = (y_hi.ln() - y0.ln()) / (y_hi.ln() - y_lo.ln());
                return Some(x_lo + t * (x_hi - x_lo));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_pointwise() {
        let mut a = XySequence::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]);
        let b = XySequence::new(vec![0.0, 1.0, 2.0], vec![10.0, 20.0, 30.0]);
        a.add(&b);
        assert_eq!(a.y(), &[11.0, 22.0, 33.0]);
    }

    #[test]
    fn complement_inverts() {
        let mut a = XySequence::new(vec![0.0, 1.0], vec![0.1, 0.9]);
        a.complement();
        assert_eq!(a.y(), &[0.9, 0.1]);
    }

    #[test]
    #[should_panic(expected = "x-axis mismatch")]
    fn add_panics_on_mismatched_axes() {
        let mut a = XySequence::new(vec![0.0, 1.0], vec![1.0, 2.0]);
        let b = XySequence::new(vec![0.0, 2.0], vec![1.0, 2.0]);
        a.add(&b);
    }

    #[test]
    fn interpolate_x_log_y_matches_scenario_six() {
        let x = vec![0.1_f64.ln(), 0.2_f64.ln(), 0.4_f64.ln()];
        let y = vec![1e-2, 1e-3, 1e-4];
        let seq = XySequence::new(x, y);
        let iml = seq.interpolate_x_log_y(2e-3).unwrap().exp();
        assert!((iml - 0.1516).abs() < 1e-3, "iml = {iml}");
    }

    #[test]
    fn zeros_like_shares_x_axis() {
        let template = XySequence::new(vec![0.0, 1.0], vec![5.0, 6.0]);
        let z = XySequence::zeros_like(&template);
        assert!(z.same_x_as(&template));
        assert_eq!(z.y(), &[0.0, 0.0]);
    }
}
