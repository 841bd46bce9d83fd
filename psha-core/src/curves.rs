//! Hazard curve containers: `HazardCurves` (one source set's per-IMT
//! curves, total and per-GMM), `HazardCurveSet` (attribution-preserving
//! wrapper around it), and `Hazard` (the final, fully consolidated result
//! of a calculation).
//!
//! Curves stay in natural-log-x space throughout (§3); converting to
//! linear IML units for display is an external collaborator's job.

use crate::config::CalcConfig;
use crate::error::{PshaError, PshaResult};
use crate::imt::Imt;
use crate::input::ParentRef;
use crate::model::SourceType;
use crate::site::Site;
use crate::xy::XySequence;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-IMT curves produced by reducing a single source set (or, after
/// consolidation, an entire calculation), carrying both the GMM-weighted
/// total and each individual GMM's own curve (§4.2).
#[derive(Debug, Clone, Default)]
pub struct HazardCurves {
    total: HashMap<Imt, XySequence>,
    by_gmm: HashMap<Imt, HashMap<String, XySequence>>,
}

impl HazardCurves {
    /// The GMM-weighted total curve for `imt`.
    #[must_use]
    pub fn get(&self, imt: Imt) -> Option<&XySequence> {
        self.total.get(&imt)
    }

    /// One GMM's own (unweighted) curve for `imt`, before cross-GMM
    /// combination (§4.2).
    #[must_use]
    pub fn get_gmm(&self, imt: Imt, gmm_id: &str) -> Option<&XySequence> {
        self.by_gmm.get(&imt)?.get(gmm_id)
    }

    /// Every GMM id with a curve recorded for `imt`.
    pub fn gmm_ids(&self, imt: Imt) -> impl Iterator<Item = &str> {
        self.by_gmm
            .get(&imt)
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    #[must_use]
    pub fn imts(&self) -> impl Iterator<Item = Imt> + '_ {
        self.total.keys().copied()
    }

    /// Iterate the total curve per IMT.
    pub fn iter(&self) -> impl Iterator<Item = (Imt, &XySequence)> {
        self.total.iter().map(|(imt, curve)| (*imt, curve))
    }
}

/// Accumulates per-IMT curve contributions behind a stable zero-filled
/// template, for one source set's fan-in reduction (§5). `build` may only
/// succeed once; a second call signals a pipeline-wiring bug rather than a
/// recoverable condition, so it is reported via [`PshaError::BuilderExhausted`].
pub struct HazardCurvesBuilder {
    total: HashMap<Imt, XySequence>,
    by_gmm: HashMap<Imt, HashMap<String, XySequence>>,
    template: HashMap<Imt, XySequence>,
    built: bool,
}

impl HazardCurvesBuilder {
    #[must_use]
    pub fn new(config: &CalcConfig) -> Self {
        let template: HashMap<Imt, XySequence> = config
            .imts()
            .iter()
            .filter_map(|&imt| config.log_model_curve(imt).map(|c| (imt, c.copy())))
            .collect();
        Self {
            total: template.clone(),
            by_gmm: HashMap::new(),
            template,
            built: false,
        }
    }

    /// Add a curve's contribution to the GMM-weighted total for `imt`.
    ///
    /// # Panics
    ///
    /// Panics if `imt` was not registered in the `CalcConfig` this builder
    /// was created from, or if `curve`'s x-axis disagrees with the
    /// template's.
    pub fn add_total(&mut self, imt: Imt, curve: &XySequence) -> &mut Self {
        let total = self
            .total
            .get_mut(&imt)
            .unwrap_or_else(|| panic!("HazardCurvesBuilder: {imt:?} was never registered"));
        total.add(curve);
        self
    }

    /// Add a curve's contribution to one GMM's own (unweighted) curve for
    /// `imt`.
    ///
    /// # Panics
    ///
    /// Panics if `imt` was not registered in the `CalcConfig` this builder
    /// was created from.
    pub fn add_gmm(&mut self, imt: Imt, gmm_id: &str, curve: &XySequence) -> &mut Self {
        let template = self
            .template
            .get(&imt)
            .unwrap_or_else(|| panic!("HazardCurvesBuilder: {imt:?} was never registered"));
        let entry = self
            .by_gmm
            .entry(imt)
            .or_default()
            .entry(gmm_id.to_string())
            .or_insert_with(|| XySequence::zeros_like(template));
        entry.add(curve);
        self
    }

    /// Weight-scale and merge another `HazardCurves`' total and per-GMM
    /// curves into this builder's running accumulation (§4.1, §4.2, §8
    /// scenario 1).
    pub fn merge(&mut self, other: &HazardCurves, weight: f64) -> &mut Self {
        for (imt, curve) in other.iter() {
            let mut scaled = curve.copy();
            scaled.multiply(weight);
            self.add_total(imt, &scaled);
        }
        for (imt, gmm_curves) in &other.by_gmm {
            for (gmm_id, curve) in gmm_curves {
                let mut scaled = curve.copy();
                scaled.multiply(weight);
                self.add_gmm(*imt, gmm_id, &scaled);
            }
        }
        self
    }

    /// Finalize the accumulated curves.
    ///
    /// # Errors
    ///
    /// Returns [`PshaError::BuilderExhausted`] if this builder already
    /// produced a result.
    pub fn build(&mut self) -> PshaResult<HazardCurves> {
        if self.built {
            return Err(PshaError::BuilderExhausted {
                builder: "HazardCurvesBuilder",
            });
        }
        self.built = true;
        Ok(HazardCurves {
            total: self.total.clone(),
            by_gmm: self.by_gmm.clone(),
        })
    }
}

/// One source set's curves, with the attribution metadata deaggregation
/// and reporting need to keep source sets distinguishable after they have
/// otherwise been reduced down to a curve (§4.1, §6).
#[derive(Debug, Clone)]
pub struct HazardCurveSet {
    pub source_set_name: Arc<str>,
    pub source_type: SourceType,
    pub weight: f64,
    pub curves: HazardCurves,
}

impl HazardCurveSet {
    #[must_use]
    pub fn new(parent: &ParentRef, source_type: SourceType, weight: f64, curves: HazardCurves) -> Self {
        Self {
            source_set_name: Arc::clone(&parent.source_set_name),
            source_type,
            weight,
            curves,
        }
    }
}

/// The consolidated result of one calculation at one site: a total curve
/// per IMT (with its own per-GMM decomposition) plus the per-source-set
/// breakdown it was built from.
#[derive(Debug, Clone)]
pub struct Hazard {
    pub site: Site,
    pub total_curves: HazardCurves,
    pub source_set_curves: Vec<HazardCurveSet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceedance::ExceedanceModel;
    use crate::model::SourceSetId;

    fn config() -> CalcConfig {
        crate::config::CalcConfigBuilder::new()
            .with_imls(Imt::Pga, vec![0.01, 0.1, 1.0])
            .with_exceedance_model(ExceedanceModel::TruncationOff)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_sums_two_contributions() {
        let config = config();
        let mut builder = HazardCurvesBuilder::new(&config);
        let contribution = config.log_model_curve(Imt::Pga).unwrap().copy();
        let mut c1 = contribution.copy();
        c1.y_mut().iter_mut().for_each(|v| *v = 1e-3);
        let mut c2 = contribution.copy();
        c2.y_mut().iter_mut().for_each(|v| *v = 2e-3);
        builder.add_total(Imt::Pga, &c1);
        builder.add_total(Imt::Pga, &c2);
        let result = builder.build().unwrap();
        assert!(result.get(Imt::Pga).unwrap().y().iter().all(|&v| (v - 3e-3).abs() < 1e-12));
    }

    #[test]
    fn builder_errors_on_second_build() {
        let config = config();
        let mut builder = HazardCurvesBuilder::new(&config);
        assert!(builder.build().is_ok());
        let err = builder.build().unwrap_err();
        assert!(matches!(err, PshaError::BuilderExhausted { .. }));
    }

    #[test]
    fn merge_weights_each_source_set_and_keeps_per_gmm_curves() {
        let config = config();
        let template = config.log_model_curve(Imt::Pga).unwrap();
        let mut inner = HazardCurvesBuilder::new(&config);
        let mut curve = template.copy();
        curve.y_mut().iter_mut().for_each(|v| *v = 1e-2);
        inner.add_total(Imt::Pga, &curve);
        inner.add_gmm(Imt::Pga, "gmm-a", &curve);
        let curves = inner.build().unwrap();

        let mut builder = HazardCurvesBuilder::new(&config);
        builder.merge(&curves, 0.5);
        let merged = builder.build().unwrap();
        assert!(merged.get(Imt::Pga).unwrap().y().iter().all(|&v| (v - 5e-3).abs() < 1e-12));
        assert!(
            merged
                .get_gmm(Imt::Pga, "gmm-a")
                .unwrap()
                .y()
                .iter()
                .all(|&v| (v - 5e-3).abs() < 1e-12)
        );
    }

    #[test]
    fn hazard_curve_set_carries_attribution() {
        let config = config();
        let parent = ParentRef::new(SourceSetId(1), "set-a");
        let curves = HazardCurves::default();
        let set = HazardCurveSet::new(&parent, SourceType::Fault, 0.5, curves);
        assert_eq!(&*set.source_set_name, "set-a");
        let _ = config;
    }
}
