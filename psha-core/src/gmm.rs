//! Ground-motion model (GMM) contracts.
//!
//! The concrete GMM formulae are an external collaborator's responsibility
//! (§1); this module defines the trait boundary and the container types
//! (`GmmSet`) the pipeline drives GMMs through.

use crate::imt::Imt;
use std::collections::HashMap;

/// Per-rupture, per-site input to a GMM's `calc` function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmmInput {
    pub mw: f64,
    pub r_jb: f64,
    pub r_rup: f64,
    pub r_x: f64,
    pub dip: f64,
    pub width: f64,
    pub z_top: f64,
    pub z_hyp: f64,
    pub rake: f64,
    pub vs30: f64,
    pub vs_inferred: bool,
    pub z1p0: f64,
    pub z2p5: f64,
}

/// A GMM's output for one `GmmInput`: either a single (mean, sigma) pair, or
/// a multi-scalar logic tree of weighted means and weighted sigmas (§3).
/// Means and sigmas are natural-log IMT units.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarGroundMotion {
    /// A single predicted (mean, sigma) pair.
    Scalar { mean: f64, sigma: f64 },
    /// Parallel arrays of weighted means and weighted sigmas, representing
    /// an internal epistemic logic tree within the GMM itself.
    Multi {
        means: Vec<f64>,
        mean_weights: Vec<f64>,
        sigmas: Vec<f64>,
        sigma_weights: Vec<f64>,
    },
}

impl ScalarGroundMotion {
    /// Weight-averaged (mean, sigma), used wherever a caller needs a single
    /// representative pair rather than the full multi-scalar breakdown.
    #[must_use]
    pub fn weighted_mean_sigma(&self) -> (f64, f64) {
        match self {
            ScalarGroundMotion::Scalar { mean, sigma } => (*mean, *sigma),
            ScalarGroundMotion::Multi {
                means,
                mean_weights,
                sigmas,
                sigma_weights,
            } => {
                let mean = means
                    .iter()
                    .zip(mean_weights)
                    .map(|(m, w)| m * w)
                    .sum::<f64>();
                let sigma = sigmas
                    .iter()
                    .zip(sigma_weights)
                    .map(|(s, w)| s * w)
                    .sum::<f64>();
                (mean, sigma)
            }
        }
    }
}

/// A tag identifying a ground-motion model. Implementors are supplied by
/// the caller; this crate never computes a GMPE formula itself.
pub trait GroundMotionModel: Send + Sync {
    /// Stable identifier, used as a map key and in reported output.
    fn id(&self) -> &str;

    /// Evaluate the model for one rupture/site input, for the given IMT.
    fn calc(&self, imt: Imt, input: &GmmInput) -> ScalarGroundMotion;
}

/// Epistemic-uncertainty adjustment applied when `CalcConfig::gmm_uncertainty`
/// is enabled (§4.2).
pub struct EpistemicModel {
    epi_value_fn: Box<dyn Fn(f64, f64) -> f64 + Send + Sync>,
    /// Weights for the three `(μ - Δ, μ, μ + Δ)` branches, in that order.
    weights: [f64; 3],
}

impl EpistemicModel {
    #[must_use]
    pub fn new(
        epi_value_fn: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
        weights: [f64; 3],
    ) -> Self {
        Self {
            epi_value_fn: Box::new(epi_value_fn),
            weights,
        }
    }

    /// `Δ = epi_value(Mw, rJB)`.
    #[must_use]
    pub fn epi_value(&self, mw: f64, r_jb: f64) -> f64 {
        (self.epi_value_fn)(mw, r_jb)
    }

    #[must_use]
    pub fn epi_weights(&self) -> [f64; 3] {
        self.weights
    }
}

/// A set of GMMs with per-GMM weights (distance-dependent) and an optional
/// epistemic-uncertainty model (§3).
pub struct GmmSet {
    models: Vec<Box<dyn GroundMotionModel>>,
    /// Maximum source-to-site distance (km) beyond which this model set
    /// does not apply; callers use it to filter sources before submission.
    pub max_distance: f64,
    weight_map_fn: Box<dyn Fn(f64) -> HashMap<String, f64> + Send + Sync>,
    epistemic: Option<EpistemicModel>,
}

impl GmmSet {
    #[must_use]
    pub fn new(
        models: Vec<Box<dyn GroundMotionModel>>,
        max_distance: f64,
        weight_map_fn: impl Fn(f64) -> HashMap<String, f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            models,
            max_distance,
            weight_map_fn: Box::new(weight_map_fn),
            epistemic: None,
        }
    }

    #[must_use]
    pub fn with_epistemic(mut self, epistemic: EpistemicModel) -> Self {
        self.epistemic = Some(epistemic);
        self
    }

    #[must_use]
    pub fn models(&self) -> &[Box<dyn GroundMotionModel>] {
        &self.models
    }

    /// Per-GMM weight map for the given minimum rupture-to-site distance
    /// across an `InputList` (§4.2, §4.5).
    #[must_use]
    pub fn weight_map(&self, min_distance: f64) -> HashMap<String, f64> {
        (self.weight_map_fn)(min_distance)
    }

    #[must_use]
    pub fn epistemic(&self) -> Option<&EpistemicModel> {
        self.epistemic.as_ref()
    }

    #[must_use]
    pub fn supports_epistemic(&self) -> bool {
        self.epistemic.is_some()
    }
}

impl std::fmt::Debug for GmmSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmmSet")
            .field(
                "models",
                &self.models.iter().map(|m| m.id()).collect::<Vec<_>>(),
            )
            .field("max_distance", &self.max_distance)
            .field("has_epistemic", &self.epistemic.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantGmm {
        mean: f64,
        sigma: f64,
    }

    impl GroundMotionModel for ConstantGmm {
        fn id(&self) -> &str {
            "constant"
        }
        fn calc(&self, _imt: Imt, _input: &GmmInput) -> ScalarGroundMotion {
            ScalarGroundMotion::Scalar {
                mean: self.mean,
                sigma: self.sigma,
            }
        }
    }

    #[test]
    fn multi_scalar_weighted_mean_matches_hand_calc() {
        let sgm = ScalarGroundMotion::Multi {
            means: vec![1.0, 3.0],
            mean_weights: vec![0.25, 0.75],
            sigmas: vec![0.4, 0.6],
            sigma_weights: vec![0.5, 0.5],
        };
        let (mean, sigma) = sgm.weighted_mean_sigma();
        assert!((mean - 2.5).abs() < 1e-12);
        assert!((sigma - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weight_map_is_distance_dependent() {
        let set = GmmSet::new(
            vec![Box::new(ConstantGmm {
                mean: -1.0,
                sigma: 0.5,
            })],
            200.0,
            |d| {
                let mut m = HashMap::new();
                m.insert("constant".to_string(), if d < 50.0 { 1.0 } else { 0.5 });
                m
            },
        );
        assert_eq!(set.weight_map(10.0)["constant"], 1.0);
        assert_eq!(set.weight_map(100.0)["constant"], 0.5);
    }
}
