//! `GroundMotions`: per-GMM mean/sigma tables produced by evaluating an
//! `InputList` against a `GmmSet` for one IMT (§4.2).

use crate::gmm::ScalarGroundMotion;
use crate::imt::Imt;
use std::collections::HashMap;

/// The output of running every `GroundMotionModel` in a `GmmSet` over every
/// `HazardInput` in an `InputList`, for a single IMT.
///
/// Rows are aligned to the originating `InputList`'s order: `values[gmm_id][i]`
/// corresponds to `inputs()[i]`.
///
/// Deliberately has no method that collapses rows across different GMMs:
/// exceedance is nonlinear in `(mean, sigma)` for the truncated/mixture
/// models, so combining GMMs must happen after each one's own exceedance
/// curve is evaluated (§4.2), never before. Callers drive this per-GMM via
/// `transform::gmm_curve`/`ground_motions_to_gmm_curves`.
#[derive(Debug, Clone)]
pub struct GroundMotions {
    imt: Imt,
    values: HashMap<String, Vec<ScalarGroundMotion>>,
}

impl GroundMotions {
    #[must_use]
    pub fn new(imt: Imt, values: HashMap<String, Vec<ScalarGroundMotion>>) -> Self {
        Self { imt, values }
    }

    #[must_use]
    pub fn imt(&self) -> Imt {
        self.imt
    }

    #[must_use]
    pub fn gmm_ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn for_gmm(&self, gmm_id: &str) -> Option<&[ScalarGroundMotion]> {
        self.values.get(gmm_id).map(Vec::as_slice)
    }

    /// Number of rows (equal to the source `InputList`'s length) for any
    /// GMM present, or `0` if this table is empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.values().next().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_is_zero_for_an_empty_table() {
        let gms = GroundMotions::new(Imt::Pga, HashMap::new());
        assert!(gms.is_empty());
    }

    #[test]
    fn for_gmm_returns_none_for_an_unknown_id() {
        let gms = GroundMotions::new(Imt::Pga, HashMap::new());
        assert!(gms.for_gmm("nope").is_none());
    }
}
