//! System-source pipeline: a bulk `InputList` is generated once per site
//! (§4.6), then curve computation may be partitioned into batches across
//! worker threads. Partitioning must never change the result: summing the
//! curves from batches of the same `InputList` equals the curve computed
//! from the whole list in one pass (§8 scenario 5).
//!
//! Batches are sized by `config.system_partition()` (default 1000 rows per
//! batch), not by thread count — the thread pool size and the batch size
//! are independent knobs (§4.6, §7).

use crate::config::CalcConfig;
use crate::curves::{HazardCurves, HazardCurvesBuilder};
use crate::gmm::ScalarGroundMotion;
use crate::imt::Imt;
use crate::input::HazardInput;
use crate::model::SystemSourceSet;
use crate::site::Site;
use crate::transform::{combine_gmm_curves, gmm_curve, inputs_to_ground_motions};
use crate::xy::XySequence;
use std::collections::HashMap;

/// Split `len` rows into contiguous batches of at most `batch_size` rows
/// each. A `batch_size` of `0` is treated as "one batch holding everything".
fn chunk_bounds(len: usize, batch_size: usize) -> Vec<(usize, usize)> {
    if batch_size == 0 || len == 0 {
        return vec![(0, len)];
    }
    let mut bounds = Vec::with_capacity(len.div_ceil(batch_size));
    let mut start = 0;
    while start < len {
        let end = (start + batch_size).min(len);
        bounds.push((start, end));
        start = end;
    }
    bounds
}

/// Compute every GMM's own curve for a system source set's one IMT, summing
/// batch-by-batch over the bulk `InputList` (§4.2, §4.6).
#[must_use]
pub fn system_gmm_curves_for_imt(
    source_set: &dyn SystemSourceSet,
    site: &Site,
    config: &CalcConfig,
    imt: Imt,
    batch_size: usize,
) -> HashMap<String, XySequence> {
    let inputs = source_set.to_inputs(site);
    let template = config
        .log_model_curve(imt)
        .unwrap_or_else(|| panic!("system_gmm_curves_for_imt: {imt:?} not in CalcConfig"));
    let gmm_set = source_set.gmm_set();

    let mut totals: HashMap<String, XySequence> = gmm_set
        .models()
        .iter()
        .map(|model| (model.id().to_string(), XySequence::zeros_like(template)))
        .collect();
    if inputs.is_empty() {
        return totals;
    }

    let ground_motions = inputs_to_ground_motions(&inputs, gmm_set, imt);
    let all_inputs: &[HazardInput] = inputs.inputs();
    let rows_by_gmm: HashMap<&str, &[ScalarGroundMotion]> = ground_motions
        .gmm_ids()
        .map(|id| (id, ground_motions.for_gmm(id).expect("gmm_id came from gmm_ids()")))
        .collect();

    for (start, end) in chunk_bounds(all_inputs.len(), batch_size) {
        let chunk_inputs = &all_inputs[start..end];
        for (gmm_id, rows) in &rows_by_gmm {
            let chunk_rows = &rows[start..end];
            let curve = gmm_curve(template, config, gmm_set, imt, chunk_inputs, chunk_rows);
            totals
                .get_mut(*gmm_id)
                .expect("totals seeded from the same gmm_set")
                .add(&curve);
        }
    }
    totals
}

/// Compute one IMT's GMM-weighted total curve for a system source set,
/// batching the bulk `InputList` into chunks of `batch_size` rows.
#[must_use]
pub fn system_curve_for_imt(
    source_set: &dyn SystemSourceSet,
    site: &Site,
    config: &CalcConfig,
    imt: Imt,
    batch_size: usize,
) -> XySequence {
    let template = config
        .log_model_curve(imt)
        .unwrap_or_else(|| panic!("system_curve_for_imt: {imt:?} not in CalcConfig"));
    let by_gmm = system_gmm_curves_for_imt(source_set, site, config, imt, batch_size);
    let inputs = source_set.to_inputs(site);
    let gmm_set = source_set.gmm_set();
    let weights = gmm_set.weight_map(inputs.min_distance());
    combine_gmm_curves(template, &by_gmm, &weights)
}

/// Compute every configured IMT's curve for a system source set, using
/// `config`'s configured batch size (`system_partition`, §7).
#[must_use]
pub fn system_source_set_to_curves(
    source_set: &dyn SystemSourceSet,
    site: &Site,
    config: &CalcConfig,
) -> HazardCurves {
    let batch_size = config.system_partition();
    let mut builder = HazardCurvesBuilder::new(config);
    for &imt in config.imts() {
        let by_gmm = system_gmm_curves_for_imt(source_set, site, config, imt, batch_size);
        let template = config
            .log_model_curve(imt)
            .unwrap_or_else(|| panic!("system_source_set_to_curves: {imt:?} not in CalcConfig"));
        let inputs = source_set.to_inputs(site);
        let weights = source_set.gmm_set().weight_map(inputs.min_distance());
        let total = combine_gmm_curves(template, &by_gmm, &weights);
        for (gmm_id, curve) in &by_gmm {
            builder.add_gmm(imt, gmm_id, curve);
        }
        builder.add_total(imt, &total);
    }
    builder.build().expect("fresh HazardCurvesBuilder never exhausted")
}
