//! Deaggregation orchestration: given a target intensity and a hazard
//! model, bin each source's rate contribution by distance, magnitude, and
//! epsilon (§4.5).

use crate::config::CalcConfig;
use crate::deagg::contributor::Contributor;
use crate::deagg::dataset::{DeaggBounds, DeaggResult};
use crate::error::PshaResult;
use crate::gmm::GmmSet;
use crate::imt::Imt;
use crate::input::{InputList, ParentRef};
use crate::model::{ClusterInstance, HazardModel, SourceSetKind, SourceType};
use crate::site::Site;
use crate::transform::{inputs_to_ground_motions, source_to_inputs};
use crate::xy::XySequence;

/// Resolve the natural-log IML at which a consolidated hazard curve crosses
/// `target_rate`, the usual way a deaggregation target is chosen (§4.5, §8
/// scenario 6). `total_curve`'s x-axis is already natural-log (§3), so the
/// result is directly usable as `x0` below.
#[must_use]
pub fn resolve_target_iml(total_curve: &XySequence, target_rate: f64) -> Option<f64> {
    total_curve.interpolate_x_log_y(target_rate)
}

/// Bin every rupture in `inputs` into a distance/magnitude/epsilon result,
/// evaluating each GMM's own exceedance probability per rupture before any
/// cross-GMM weighting, exactly as `transform::gmm_curve` does for curves
/// (§4.2). `rate_multiplier` carries the caller's own scale factor (a
/// source set's weight, or a cluster fault's linearized union-probability
/// share, §4.3, §8 scenario 1) — applied once, on top of each rupture's own
/// rate.
///
/// When `config.gmm_uncertainty()` is set and `gmm_set` carries an
/// `EpistemicModel`, each rupture's mean is expanded into the three
/// weighted branches `(mean - delta, mean, mean + delta)` before the
/// exceedance probability is evaluated, mirroring `gmm_curve` (§4.2).
fn bin_inputs(
    inputs: &InputList,
    gmm_set: &GmmSet,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    rate_multiplier: f64,
    bounds: DeaggBounds,
) -> DeaggResult {
    let mut result = DeaggResult::new(bounds);
    if inputs.is_empty() || rate_multiplier <= 0.0 {
        return result;
    }
    let exceedance_model = config.exceedance_model();
    let epistemic = if config.gmm_uncertainty() {
        gmm_set.epistemic()
    } else {
        None
    };
    let ground_motions = inputs_to_ground_motions(inputs, gmm_set, imt);
    let weights = gmm_set.weight_map(inputs.min_distance());

    for gmm_id in ground_motions.gmm_ids() {
        let rows = ground_motions
            .for_gmm(gmm_id)
            .expect("gmm_id came from gmm_ids()");
        let gmm_weight = weights.get(gmm_id).copied().unwrap_or(0.0);
        for (row, input) in rows.iter().zip(inputs.inputs()) {
            let (mean, sigma) = row.weighted_mean_sigma();
            if sigma <= 0.0 {
                continue;
            }
            match epistemic {
                Some(epi) => {
                    let delta = epi.epi_value(input.mw, input.r_jb);
                    let branches = [mean - delta, mean, mean + delta];
                    for (&branch_mean, &branch_weight) in branches.iter().zip(&epi.epi_weights()) {
                        if branch_weight <= 0.0 {
                            continue;
                        }
                        let eps = (x0 - branch_mean) / sigma;
                        let prob = exceedance_model.probability(x0, branch_mean, sigma, imt);
                        let rate = rate_multiplier * input.rate * branch_weight * prob;
                        result.add_gmm(gmm_id, input.r_rup, input.mw, eps, rate);
                        if gmm_weight > 0.0 {
                            result.add_total(input.r_rup, input.mw, eps, rate * gmm_weight);
                        }
                    }
                }
                None => {
                    let eps = (x0 - mean) / sigma;
                    let prob = exceedance_model.probability(x0, mean, sigma, imt);
                    let rate = rate_multiplier * input.rate * prob;
                    result.add_gmm(gmm_id, input.r_rup, input.mw, eps, rate);
                    if gmm_weight > 0.0 {
                        result.add_total(input.r_rup, input.mw, eps, rate * gmm_weight);
                    }
                }
            }
        }
    }
    result
}

/// The GMM-weighted marginal exceedance probability of `inputs` at `x0`,
/// summed (and epistemic-branch-weighted) the same way `bin_inputs`
/// combines GMMs, used by `deaggregate_cluster_instance` for the
/// union-probability complement (§4.3). Clamped to `[0, 1]`, since this is
/// a probability, not a rate.
fn fault_probability(inputs: &InputList, gmm_set: &GmmSet, imt: Imt, x0: f64, config: &CalcConfig) -> f64 {
    if inputs.is_empty() {
        return 0.0;
    }
    let exceedance_model = config.exceedance_model();
    let epistemic = if config.gmm_uncertainty() {
        gmm_set.epistemic()
    } else {
        None
    };
    let ground_motions = inputs_to_ground_motions(inputs, gmm_set, imt);
    let weights = gmm_set.weight_map(inputs.min_distance());

    let mut total = 0.0;
    for gmm_id in ground_motions.gmm_ids() {
        let weight = weights.get(gmm_id).copied().unwrap_or(0.0);
        if weight <= 0.0 {
            continue;
        }
        let rows = ground_motions
            .for_gmm(gmm_id)
            .expect("gmm_id came from gmm_ids()");
        for (row, input) in rows.iter().zip(inputs.inputs()) {
            let (mean, sigma) = row.weighted_mean_sigma();
            match epistemic {
                Some(epi) => {
                    let delta = epi.epi_value(input.mw, input.r_jb);
                    let branches = [mean - delta, mean, mean + delta];
                    for (&branch_mean, &branch_weight) in branches.iter().zip(&epi.epi_weights()) {
                        let prob = exceedance_model.probability(x0, branch_mean, sigma, imt);
                        total += input.rate * weight * branch_weight * prob;
                    }
                }
                None => {
                    let prob = exceedance_model.probability(x0, mean, sigma, imt);
                    total += input.rate * weight * prob;
                }
            }
        }
    }
    total.min(1.0)
}

fn deaggregate_standard(
    source_set: &dyn crate::model::StandardSourceSet,
    site: &Site,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    bounds: DeaggBounds,
) -> Contributor {
    let parent = ParentRef::new(source_set.id(), source_set.name());
    let gmm_set = source_set.gmm_set();
    let sources = source_set.sources_for(site);
    let rate_multiplier = source_set.weight();

    let mut children = Vec::with_capacity(sources.len());
    let mut total = DeaggResult::new(bounds);
    for source in &sources {
        let inputs = source_to_inputs(source.as_ref(), gmm_set, site, parent.clone());
        let dataset = bin_inputs(&inputs, gmm_set, imt, x0, config, rate_multiplier, bounds);
        total.merge(&dataset);
        children.push(Contributor::Source {
            name: std::sync::Arc::from(source.name()),
            dataset,
        });
    }

    Contributor::SourceSet {
        name: std::sync::Arc::from(source_set.name()),
        source_type: source_set.source_type(),
        children,
        dataset: total,
    }
}

/// Deaggregate one cluster instance, attributing the instance's combined
/// rate back to its faults via the linearized union-probability split
/// `rate_i ≈ instance.rate * source_set.weight() * C_i(x0) *
/// ∏_{j≠i}(1 - C_j(x0))`, which sums to approximately (not exactly)
/// `instance.rate * source_set.weight() * C_clust(x0)` — an attribution
/// choice this crate makes where the distilled exceedance model leaves
/// cluster deaggregation unspecified (see DESIGN.md). Each fault's own
/// marginal probability `C_i` is itself GMM-weighted via
/// `fault_probability`, not pre-averaged (§4.2, §4.3).
fn deaggregate_cluster_instance(
    instance: &ClusterInstance,
    gmm_set: &GmmSet,
    site: &Site,
    parent: &ParentRef,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    source_set_weight: f64,
    bounds: DeaggBounds,
) -> Contributor {
    let fault_probs: Vec<(InputList, f64)> = instance
        .faults
        .iter()
        .map(|fault| {
            let inputs = source_to_inputs(fault, gmm_set, site, parent.clone());
            let prob = fault_probability(&inputs, gmm_set, imt, x0, config);
            (inputs, prob)
        })
        .collect();

    let mut dataset = DeaggResult::new(bounds);
    for (i, (inputs, _prob_i)) in fault_probs.iter().enumerate() {
        let complement: f64 = fault_probs
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, p))| 1.0 - p)
            .product();
        let rate_multiplier = instance.rate * source_set_weight * complement;
        let contribution = bin_inputs(inputs, gmm_set, imt, x0, config, rate_multiplier, bounds);
        dataset.merge(&contribution);
    }

    Contributor::Cluster {
        name: std::sync::Arc::from(instance.name.as_str()),
        dataset,
    }
}

fn deaggregate_cluster(
    source_set: &dyn crate::model::ClusterSourceSet,
    site: &Site,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    bounds: DeaggBounds,
) -> Contributor {
    let parent = ParentRef::new(source_set.id(), source_set.name());
    let gmm_set = source_set.gmm_set();
    let instances = source_set.clusters_for(site);
    let source_set_weight = source_set.weight();

    let mut children = Vec::with_capacity(instances.len());
    let mut total = DeaggResult::new(bounds);
    for instance in &instances {
        let contributor = deaggregate_cluster_instance(
            instance,
            gmm_set,
            site,
            &parent,
            imt,
            x0,
            config,
            source_set_weight,
            bounds,
        );
        total.merge(contributor.dataset());
        children.push(contributor);
    }

    Contributor::SourceSet {
        name: std::sync::Arc::from(source_set.name()),
        source_type: SourceType::Cluster,
        children,
        dataset: total,
    }
}

fn deaggregate_system(
    source_set: &dyn crate::model::SystemSourceSet,
    site: &Site,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    bounds: DeaggBounds,
) -> Contributor {
    let inputs = source_set.to_inputs(site);
    let dataset = bin_inputs(
        &inputs,
        source_set.gmm_set(),
        imt,
        x0,
        config,
        source_set.weight(),
        bounds,
    );
    Contributor::System {
        name: std::sync::Arc::from(source_set.name()),
        dataset,
    }
}

/// Dispatch one source set to the binning routine matching its kind.
/// Shared by the sequential [`deaggregate_model`] and the async fan-out in
/// `pipeline.rs`, so both paths bin a source set identically.
#[must_use]
pub fn deaggregate_source_set(
    set: &SourceSetKind,
    site: &Site,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    bounds: DeaggBounds,
) -> Contributor {
    match set {
        SourceSetKind::Standard(s) => deaggregate_standard(s.as_ref(), site, imt, x0, config, bounds),
        SourceSetKind::Cluster(s) => deaggregate_cluster(s.as_ref(), site, imt, x0, config, bounds),
        SourceSetKind::System(s) => deaggregate_system(s.as_ref(), site, imt, x0, config, bounds),
    }
}

/// Deaggregate an entire hazard model at `site`, for one IMT and one target
/// natural-log IML `x0`, producing the total binned result and the
/// per-source-set contributor trees it was built from (§4.5, §6).
///
/// # Errors
///
/// Propagates [`crate::error::PshaError::ComputationFailed`] if merging the
/// per-source-set contributors fails (only possible if two source sets
/// share a name but disagree in kind, a model-construction bug).
pub fn deaggregate_model(
    model: &HazardModel,
    site: &Site,
    imt: Imt,
    x0: f64,
    config: &CalcConfig,
    bounds: DeaggBounds,
) -> PshaResult<(DeaggResult, Vec<Contributor>)> {
    let contributors: Vec<Contributor> = model
        .source_sets
        .iter()
        .map(|set| deaggregate_source_set(set, site, imt, x0, config, bounds))
        .collect();

    crate::deagg::consolidate::consolidate(bounds, contributors)
}
