//! The standard (non-cluster, non-system) per-source-set pipeline: the
//! chain of stages a fault/grid/slab/area source is pushed through to
//! produce its contribution to a hazard curve (§4.1, §5).
//!
//! Each stage is a plain function so the async orchestration layer
//! (`pipeline.rs`) can freely interleave them with `tokio::spawn` /
//! `spawn_blocking` without this module knowing anything about tasks.

use crate::config::CalcConfig;
use crate::curves::{HazardCurveSet, HazardCurves, HazardCurvesBuilder};
use crate::gmm::{GmmInput, GmmSet, ScalarGroundMotion};
use crate::ground_motions::GroundMotions;
use crate::imt::Imt;
use crate::input::{HazardInput, InputList, ParentRef};
use crate::model::{Source, SourceType};
use crate::site::Site;
use crate::xy::XySequence;
use rayon::prelude::*;
use std::collections::HashMap;

/// Stage 1: reduce one source's ruptures to flat `HazardInput` rows,
/// filtering out ruptures beyond the GMM set's maximum distance.
#[must_use]
pub fn source_to_inputs(
    source: &dyn Source,
    gmm_set: &GmmSet,
    site: &Site,
    parent: ParentRef,
) -> InputList {
    let inputs: Vec<HazardInput> = source
        .ruptures()
        .iter()
        .filter_map(|rupture| {
            let distance = rupture.surface.distance_to(site);
            if distance.r_jb > gmm_set.max_distance {
                return None;
            }
            Some(HazardInput {
                rate: rupture.rate,
                mw: rupture.mag,
                r_jb: distance.r_jb,
                r_rup: distance.r_rup,
                r_x: distance.r_x,
                dip: rupture.surface.dip(),
                width: rupture.surface.width(),
                z_top: rupture.surface.z_top(),
                z_hyp: rupture.surface.z_top() + rupture.surface.width() / 2.0 * rupture.surface.dip().to_radians().sin(),
                rake: rupture.rake,
                vs30: site.vs30,
                vs_inferred: site.vs_inferred,
                z1p0: site.z1p0,
                z2p5: site.z2p5,
            })
        })
        .collect();
    InputList::new(parent, inputs)
}

/// Stage 2: evaluate every GMM in `gmm_set` against every input, for one
/// IMT. The per-row GMM evaluations are independent, so this is the stage
/// rayon parallelizes (§5).
#[must_use]
pub fn inputs_to_ground_motions(inputs: &InputList, gmm_set: &GmmSet, imt: Imt) -> GroundMotions {
    let values: HashMap<String, Vec<ScalarGroundMotion>> = gmm_set
        .models()
        .iter()
        .map(|model| {
            let rows: Vec<ScalarGroundMotion> = inputs
                .inputs()
                .par_iter()
                .map(|input| {
                    let gmm_input = GmmInput {
                        mw: input.mw,
                        r_jb: input.r_jb,
                        r_rup: input.r_rup,
                        r_x: input.r_x,
                        dip: input.dip,
                        width: input.width,
                        z_top: input.z_top,
                        z_hyp: input.z_hyp,
                        rake: input.rake,
                        vs30: input.vs30,
                        vs_inferred: input.vs_inferred,
                        z1p0: input.z1p0,
                        z2p5: input.z2p5,
                    };
                    model.calc(imt, &gmm_input)
                })
                .collect();
            (model.id().to_string(), rows)
        })
        .collect();
    GroundMotions::new(imt, values)
}

/// Stage 3a: fold one GMM's own rows down to its own rate-weighted
/// exceedance curve (§4.2). Exceedance is nonlinear in `(mean, sigma)`, so
/// this evaluates the exceedance model once per rupture for *this* GMM
/// alone; combining across GMMs (`combine_gmm_curves`) only ever weights
/// the resulting curves, never the rows that produced them.
///
/// When `config.gmm_uncertainty()` is set and `gmm_set` carries an
/// `EpistemicModel`, each rupture's mean is expanded into the three
/// weighted branches `(mean - delta, mean, mean + delta)` before the
/// exceedance model is evaluated, and the branch curves are weight-summed
/// into this rupture's contribution (§4.2).
#[must_use]
pub fn gmm_curve(
    template: &XySequence,
    config: &CalcConfig,
    gmm_set: &GmmSet,
    imt: Imt,
    inputs: &[HazardInput],
    rows: &[ScalarGroundMotion],
) -> XySequence {
    assert_eq!(inputs.len(), rows.len(), "gmm_curve: length mismatch");
    let exceedance_model = config.exceedance_model();
    let epistemic = if config.gmm_uncertainty() {
        gmm_set.epistemic()
    } else {
        None
    };

    let mut total = XySequence::zeros_like(template);
    for (row, input) in rows.iter().zip(inputs) {
        let (mean, sigma) = row.weighted_mean_sigma();
        match epistemic {
            Some(epi) => {
                let delta = epi.epi_value(input.mw, input.r_jb);
                let branches = [mean - delta, mean, mean + delta];
                for (&branch_mean, &weight) in branches.iter().zip(&epi.epi_weights()) {
                    if weight <= 0.0 {
                        continue;
                    }
                    let mut curve = exceedance_model.exceedance(template.x(), branch_mean, sigma, imt);
                    curve.multiply(input.rate * weight);
                    total.add(&curve);
                }
            }
            None => {
                let mut curve = exceedance_model.exceedance(template.x(), mean, sigma, imt);
                curve.multiply(input.rate);
                total.add(&curve);
            }
        }
    }
    total
}

/// Stage 3b: compute every GMM's own curve for `ground_motions`' IMT,
/// keyed by GMM id.
///
/// # Panics
///
/// Panics if `ground_motions`' IMT has no registered template in `config`.
#[must_use]
pub fn ground_motions_to_gmm_curves(
    inputs: &InputList,
    ground_motions: &GroundMotions,
    gmm_set: &GmmSet,
    config: &CalcConfig,
) -> HashMap<String, XySequence> {
    let imt = ground_motions.imt();
    let template = config
        .log_model_curve(imt)
        .unwrap_or_else(|| panic!("ground_motions_to_gmm_curves: {imt:?} not in CalcConfig"));
    ground_motions
        .gmm_ids()
        .map(|gmm_id| {
            let rows = ground_motions
                .for_gmm(gmm_id)
                .expect("gmm_id came from gmm_ids()");
            let curve = gmm_curve(template, config, gmm_set, imt, inputs.inputs(), rows);
            (gmm_id.to_string(), curve)
        })
        .collect()
}

/// Stage 3c: weight-sum each GMM's own curve into the combined total
/// (§4.2). GMM weights are a single scalar per GMM for the whole
/// calculation (keyed by minimum source-to-site distance), so this is a
/// plain weighted sum of already-computed curves, never of `(mean, sigma)`
/// pairs.
#[must_use]
pub fn combine_gmm_curves(
    template: &XySequence,
    by_gmm: &HashMap<String, XySequence>,
    weights: &HashMap<String, f64>,
) -> XySequence {
    let mut total = XySequence::zeros_like(template);
    for (gmm_id, curve) in by_gmm {
        let weight = weights.get(gmm_id).copied().unwrap_or(0.0);
        if weight <= 0.0 {
            continue;
        }
        let mut scaled = curve.copy();
        scaled.multiply(weight);
        total.add(&scaled);
    }
    total
}

/// Combined stages 1-3 for one source, across every IMT in `config`,
/// producing that source's contribution as a `HazardCurves` carrying both
/// the combined total and every GMM's own curve.
#[must_use]
pub fn source_to_curves(
    source: &dyn Source,
    gmm_set: &GmmSet,
    site: &Site,
    parent: &ParentRef,
    config: &CalcConfig,
) -> HazardCurves {
    let mut builder = HazardCurvesBuilder::new(config);
    for &imt in config.imts() {
        let inputs = source_to_inputs(source, gmm_set, site, parent.clone());
        if inputs.is_empty() {
            continue;
        }
        let Some(template) = config.log_model_curve(imt) else {
            continue;
        };
        let ground_motions = inputs_to_ground_motions(&inputs, gmm_set, imt);
        let by_gmm = ground_motions_to_gmm_curves(&inputs, &ground_motions, gmm_set, config);
        let weights = gmm_set.weight_map(inputs.min_distance());
        let total = combine_gmm_curves(template, &by_gmm, &weights);
        for (gmm_id, curve) in &by_gmm {
            builder.add_gmm(imt, gmm_id, curve);
        }
        builder.add_total(imt, &total);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}

/// Fan-in reduction across every source in a standard source set: sum
/// each source's curves, total and per-GMM alike (§4.1, §8 scenario 1).
#[must_use]
pub fn consolidate_sources(config: &CalcConfig, per_source: &[HazardCurves]) -> HazardCurves {
    let mut builder = HazardCurvesBuilder::new(config);
    for curves in per_source {
        builder.merge(curves, 1.0);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}

/// Fan-in reduction across every source set in a calculation: weight-scale
/// and sum each source set's curves, total and per-GMM alike (§4.1, §8
/// scenario 1).
#[must_use]
pub fn consolidate_source_sets(config: &CalcConfig, sets: &[HazardCurveSet]) -> HazardCurves {
    let mut builder = HazardCurvesBuilder::new(config);
    for set in sets {
        builder.merge(&set.curves, set.weight);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}

/// Whether this function signature is exercised for a `Cluster`/`System`
/// set is decided by the caller: `transform.rs` only implements the
/// standard pipeline, per `model::SourceType`.
#[must_use]
pub fn is_standard(source_type: SourceType) -> bool {
    !matches!(source_type, SourceType::Cluster | SourceType::System)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceedance::ExceedanceModel;
    use crate::gmm::GroundMotionModel;
    use crate::model::{Distance, Rupture, RuptureSurface, SourceId, SourceSetId};

    struct FlatSurface {
        r: f64,
    }

    impl RuptureSurface for FlatSurface {
        fn distance_to(&self, _site: &Site) -> Distance {
            Distance {
                r_jb: self.r,
                r_rup: self.r,
                r_x: self.r,
            }
        }
        fn dip(&self) -> f64 {
            90.0
        }
        fn width(&self) -> f64 {
            10.0
        }
        fn z_top(&self) -> f64 {
            0.0
        }
    }

    struct TestSource {
        id: SourceId,
        ruptures: Vec<Rupture>,
    }

    impl Source for TestSource {
        fn id(&self) -> SourceId {
            self.id
        }
        fn name(&self) -> &str {
            "test-source"
        }
        fn ruptures(&self) -> &[Rupture] {
            &self.ruptures
        }
    }

    struct ConstantGmm;
    impl GroundMotionModel for ConstantGmm {
        fn id(&self) -> &str {
            "constant"
        }
        fn calc(&self, _imt: Imt, _input: &GmmInput) -> ScalarGroundMotion {
            ScalarGroundMotion::Scalar {
                mean: -1.0,
                sigma: 0.5,
            }
        }
    }

    fn config() -> CalcConfig {
        crate::config::CalcConfigBuilder::new()
            .with_imls(Imt::Pga, vec![0.01, 0.1, 1.0])
            .with_exceedance_model(ExceedanceModel::TruncationOff)
            .build()
            .unwrap()
    }

    fn gmm_set() -> GmmSet {
        GmmSet::new(vec![Box::new(ConstantGmm)], 300.0, |_| {
            let mut m = HashMap::new();
            m.insert("constant".to_string(), 1.0);
            m
        })
    }

    #[test]
    fn source_to_inputs_filters_by_max_distance() {
        let source = TestSource {
            id: SourceId(1),
            ruptures: vec![
                Rupture {
                    rate: 1e-4,
                    mag: 6.0,
                    rake: 0.0,
                    surface: Box::new(FlatSurface { r: 10.0 }),
                },
                Rupture {
                    rate: 1e-4,
                    mag: 6.0,
                    rake: 0.0,
                    surface: Box::new(FlatSurface { r: 1000.0 }),
                },
            ],
        };
        let site = Site::new(0.0, 0.0);
        let parent = ParentRef::new(SourceSetId(1), "set");
        let inputs = source_to_inputs(&source, &gmm_set(), &site, parent);
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn source_to_curves_produces_a_nonzero_rate_curve() {
        let source = TestSource {
            id: SourceId(1),
            ruptures: vec![Rupture {
                rate: 1e-3,
                mag: 6.5,
                rake: 0.0,
                surface: Box::new(FlatSurface { r: 20.0 }),
            }],
        };
        let site = Site::new(0.0, 0.0);
        let parent = ParentRef::new(SourceSetId(1), "set");
        let config = config();
        let gmm_set = gmm_set();
        let curves = source_to_curves(&source, &gmm_set, &site, &parent, &config);
        let curve = curves.get(Imt::Pga).unwrap();
        assert!(curve.y().iter().any(|&v| v > 0.0));
    }

    #[test]
    fn source_to_curves_total_matches_its_only_gmms_curve() {
        let source = TestSource {
            id: SourceId(1),
            ruptures: vec![Rupture {
                rate: 1e-3,
                mag: 6.5,
                rake: 0.0,
                surface: Box::new(FlatSurface { r: 20.0 }),
            }],
        };
        let site = Site::new(0.0, 0.0);
        let parent = ParentRef::new(SourceSetId(1), "set");
        let config = config();
        let gmm_set = gmm_set();
        let curves = source_to_curves(&source, &gmm_set, &site, &parent, &config);
        let total = curves.get(Imt::Pga).unwrap();
        let gmm = curves.get_gmm(Imt::Pga, "constant").unwrap();
        for (a, b) in total.y().iter().zip(gmm.y()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
