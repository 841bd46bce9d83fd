//! Async orchestration: fan out one task per source set, fan in the
//! reduction (§5). Each source set's own computation is CPU-bound (it runs
//! rayon internally), so each task is dispatched via `spawn_blocking`
//! rather than `spawn`, keeping the async runtime's worker threads free to
//! drive the fan-out/fan-in bookkeeping itself.
//!
//! When `config.optimize_grids()` is set, grid source sets are submitted to
//! the shared `JoinSet` *after* every non-grid source set: grid lookup
//! tables are the slower per-site build, so letting the faster standard/
//! cluster/system sets queue first keeps the fan-in from idling on a grid
//! table that started building before anything else had a chance to run
//! (§4.1, §5). Both groups still execute concurrently once queued — only
//! submission order changes.

use crate::cluster::cluster_source_set_to_curves;
use crate::config::CalcConfig;
use crate::curves::{Hazard, HazardCurveSet};
use crate::deagg::dataset::{DeaggBounds, DeaggResult};
use crate::deagg::{Contributor, deaggregate_source_set};
use crate::error::{PshaError, PshaResult};
use crate::imt::Imt;
use crate::input::ParentRef;
use crate::model::{HazardModel, SourceSetKind, SourceType};
use crate::site::Site;
use crate::system::system_source_set_to_curves;
use crate::transform::{consolidate_source_sets, consolidate_sources, source_to_curves};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

fn curves_for_source_set(source_set: &SourceSetKind, site: &Site, config: &CalcConfig) -> HazardCurveSet {
    let curves = match source_set {
        SourceSetKind::Standard(s) => {
            let parent = ParentRef::new(s.id(), s.name());
            let sources = s.sources_for(site);
            let per_source: Vec<_> = sources
                .iter()
                .map(|src| source_to_curves(src.as_ref(), s.gmm_set(), site, &parent, config))
                .collect();
            consolidate_sources(config, &per_source)
        }
        SourceSetKind::Cluster(s) => cluster_source_set_to_curves(s.as_ref(), site, config),
        SourceSetKind::System(s) => system_source_set_to_curves(s.as_ref(), site, config),
    };
    HazardCurveSet {
        source_set_name: Arc::from(source_set.name()),
        source_type: source_set.source_type(),
        weight: source_set.weight(),
        curves,
    }
}

/// Partition source-set indices into (non-grid, grid) submission order. When
/// `optimize_grids` is off, every index is "non-grid" — i.e. submitted in
/// the model's own order — since deferral is the only behavior this toggles.
fn submission_order(model: &HazardModel, optimize_grids: bool) -> Vec<usize> {
    let len = model.source_sets.len();
    if !optimize_grids {
        return (0..len).collect();
    }
    let is_grid = |i: usize| matches!(model.source_sets[i].source_type(), SourceType::Grid);
    let mut order: Vec<usize> = (0..len).filter(|&i| !is_grid(i)).collect();
    order.extend((0..len).filter(|&i| is_grid(i)));
    order
}

/// Run a full hazard-curve calculation: one task per source set, fanned
/// in to a single consolidated `Hazard` (§4.1, §5, §8 scenario 1).
///
/// `model` and `config` are `Arc`-shared so every fanned-out task borrows
/// the same immutable calculation inputs without cloning them (§5).
///
/// # Errors
///
/// Returns [`PshaError::PipelineCancelled`] if a source-set task panics or
/// is cancelled.
#[instrument(skip(model, config), fields(source_sets = model.source_sets.len()))]
pub async fn calculate_hazard(
    model: Arc<HazardModel>,
    site: Site,
    config: Arc<CalcConfig>,
) -> PshaResult<Hazard> {
    let mut tasks: JoinSet<HazardCurveSet> = JoinSet::new();
    for index in submission_order(&model, config.optimize_grids()) {
        let model = Arc::clone(&model);
        let config = Arc::clone(&config);
        let site = site.clone();
        tasks.spawn_blocking(move || curves_for_source_set(&model.source_sets[index], &site, &config));
    }

    let mut source_set_curves = Vec::with_capacity(model.source_sets.len());
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(curve_set) => {
                debug!(source_set = %curve_set.source_set_name, "source set reduced");
                source_set_curves.push(curve_set);
            }
            Err(join_error) => {
                warn!(error = %join_error, "source-set task did not complete");
                return Err(PshaError::PipelineCancelled {
                    stage: "calculate_hazard",
                });
            }
        }
    }

    let total_curves = consolidate_source_sets(&config, &source_set_curves);
    Ok(Hazard {
        site,
        total_curves,
        source_set_curves,
    })
}

/// Run a single-IMT deaggregation at a target intensity, fanning
/// per-source-set binning across tasks the same way `calculate_hazard`
/// fans out curve computation (grid deferral included), then consolidating
/// into one result plus the per-source-set contributor trees (§4.5, §8
/// scenario 3).
///
/// # Errors
///
/// Returns [`PshaError::PipelineCancelled`] if a task panics or is
/// cancelled, or propagates [`PshaError::ComputationFailed`] from
/// consolidating incompatible contributors.
#[instrument(skip(model, config), fields(source_sets = model.source_sets.len()))]
pub async fn calculate_deaggregation(
    model: Arc<HazardModel>,
    site: Site,
    imt: Imt,
    x0: f64,
    config: Arc<CalcConfig>,
    bounds: DeaggBounds,
) -> PshaResult<(DeaggResult, Vec<Contributor>)> {
    let mut tasks: JoinSet<Contributor> = JoinSet::new();
    for index in submission_order(&model, config.optimize_grids()) {
        let model = Arc::clone(&model);
        let config = Arc::clone(&config);
        let site = site.clone();
        tasks.spawn_blocking(move || {
            deaggregate_source_set(&model.source_sets[index], &site, imt, x0, &config, bounds)
        });
    }

    let mut contributors = Vec::with_capacity(model.source_sets.len());
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(contributor) => contributors.push(contributor),
            Err(join_error) => {
                warn!(error = %join_error, "deaggregation task did not complete");
                return Err(PshaError::PipelineCancelled {
                    stage: "calculate_deaggregation",
                });
            }
        }
    }

    crate::deagg::consolidate::consolidate(bounds, contributors)
}
