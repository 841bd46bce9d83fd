//! Cluster-source pipeline: faults that rupture together are combined by
//! joint exceedance before the cluster's own occurrence rate is applied
//! (§4.3, §8 scenario 2).
//!
//! A cluster fault's `Rupture::rate` is overloaded as a magnitude-variant
//! weight (see `model::Rupture`), so running it through the standard
//! per-source stages in `transform.rs` yields that fault's *marginal
//! exceedance probability* rather than a rate-weighted curve — exactly the
//! per-fault quantity the joint-exceedance combination needs.
//!
//! The joint combination runs per GMM (§4.2): each fault's own GMM curve is
//! joint-exceedance combined with that same GMM's curve from every other
//! fault, and only after that is the cluster's own rate applied and the
//! GMMs weight-combined, via the shared `HazardCurvesBuilder`.

use crate::config::CalcConfig;
use crate::curves::{HazardCurves, HazardCurvesBuilder};
use crate::exceedance::joint_exceedance;
use crate::gmm::GmmSet;
use crate::input::ParentRef;
use crate::model::{ClusterInstance, ClusterSourceSet};
use crate::site::Site;
use crate::transform::source_to_curves;
use std::collections::HashSet;

/// Combine one cluster instance's faults into its joint-exceedance curve,
/// scaled by the cluster's own rate, across every IMT and GMM in `config`.
#[must_use]
pub fn cluster_instance_to_curves(
    instance: &ClusterInstance,
    gmm_set: &GmmSet,
    site: &Site,
    parent: &ParentRef,
    config: &CalcConfig,
) -> HazardCurves {
    let fault_curves: Vec<HazardCurves> = instance
        .faults
        .iter()
        .map(|fault| source_to_curves(fault, gmm_set, site, parent, config))
        .collect();

    let mut builder = HazardCurvesBuilder::new(config);
    for &imt in config.imts() {
        let gmm_ids: HashSet<String> = fault_curves
            .iter()
            .flat_map(|c| c.gmm_ids(imt).map(str::to_string))
            .collect();

        for gmm_id in &gmm_ids {
            let per_fault: Vec<_> = fault_curves
                .iter()
                .filter_map(|c| c.get_gmm(imt, gmm_id).cloned())
                .collect();
            if per_fault.is_empty() {
                continue;
            }
            let mut joint = joint_exceedance(&per_fault);
            joint.multiply(instance.rate);
            builder.add_gmm(imt, gmm_id, &joint);
        }

        let per_fault_total: Vec<_> = fault_curves.iter().filter_map(|c| c.get(imt).cloned()).collect();
        if per_fault_total.is_empty() {
            continue;
        }
        let mut joint_total = joint_exceedance(&per_fault_total);
        joint_total.multiply(instance.rate);
        builder.add_total(imt, &joint_total);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}

/// Fan-in reduction across every cluster instance a cluster source set
/// contributes at `site`.
#[must_use]
pub fn cluster_source_set_to_curves(
    source_set: &dyn ClusterSourceSet,
    site: &Site,
    config: &CalcConfig,
) -> HazardCurves {
    let parent = ParentRef::new(source_set.id(), source_set.name());
    let gmm_set = source_set.gmm_set();
    let instances = source_set.clusters_for(site);

    let mut builder = HazardCurvesBuilder::new(config);
    for instance in &instances {
        let curves = cluster_instance_to_curves(instance, gmm_set, site, &parent, config);
        builder.merge(&curves, 1.0);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceedance::ExceedanceModel;
    use crate::gmm::{GmmInput, GroundMotionModel, ScalarGroundMotion};
    use crate::imt::Imt;
    use crate::model::{ClusterFault, Distance, Rupture, RuptureSurface, SourceId, SourceSetId};
    use std::collections::HashMap;

    struct FlatSurface;
    impl RuptureSurface for FlatSurface {
        fn distance_to(&self, _site: &Site) -> Distance {
            Distance {
                r_jb: 15.0,
                r_rup: 15.0,
                r_x: 15.0,
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

    struct ConstantGmm;
    impl GroundMotionModel for ConstantGmm {
        fn id(&self) -> &str {
            "constant"
        }
        fn calc(&self, _imt: Imt, _input: &GmmInput) -> ScalarGroundMotion {
            ScalarGroundMotion::Scalar {
                mean: -1.0,
                sigma: 0.6,
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

    fn fault(id: u64, weight: f64) -> ClusterFault {
        ClusterFault {
            id: SourceId(id),
            name: format!("fault-{id}"),
            ruptures: vec![Rupture {
                rate: weight,
                mag: 6.5,
                rake: 0.0,
                surface: Box::new(FlatSurface),
            }],
        }
    }

    #[test]
    fn cluster_curve_is_at_most_the_clusters_own_rate() {
        let instance = ClusterInstance {
            id: SourceId(1),
            name: "cluster-a".to_string(),
            rate: 2e-3,
            faults: vec![fault(1, 1.0), fault(2, 1.0)],
        };
        let site = Site::new(0.0, 0.0);
        let parent = ParentRef::new(SourceSetId(1), "set");
        let config = config();
        let curves = cluster_instance_to_curves(&instance, &gmm_set(), &site, &parent, &config);
        let curve = curves.get(Imt::Pga).unwrap();
        assert!(curve.y().iter().all(|&v| v <= instance.rate + 1e-12));
        assert!(curve.y().iter().any(|&v| v > 0.0));
    }

    #[test]
    fn cluster_curve_total_matches_its_only_gmm() {
        let instance = ClusterInstance {
            id: SourceId(1),
            name: "cluster-a".to_string(),
            rate: 2e-3,
            faults: vec![fault(1, 1.0), fault(2, 1.0)],
        };
        let site = Site::new(0.0, 0.0);
        let parent = ParentRef::new(SourceSetId(1), "set");
        let config = config();
        let curves = cluster_instance_to_curves(&instance, &gmm_set(), &site, &parent, &config);
        let total = curves.get(Imt::Pga).unwrap();
        let gmm = curves.get_gmm(Imt::Pga, "constant").unwrap();
        for (a, b) in total.y().iter().zip(gmm.y()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
