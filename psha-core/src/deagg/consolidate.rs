//! Fan-in reduction across a calculation's source sets: fold every source
//! set's `Contributor` tree into one total (§4.5, §8 scenario 3).

use crate::deagg::contributor::Contributor;
use crate::deagg::dataset::{DeaggBounds, DeaggResult};
use crate::error::PshaResult;
use std::sync::Arc;

/// Merge every source set's contributor tree into a single `SourceSet`-less
/// total result (total curve dimension and per-GMM alike) plus the
/// retained per-source-set breakdown.
///
/// # Errors
///
/// Propagates [`crate::error::PshaError::ComputationFailed`] if two
/// contributors sharing a name turn out to be structurally incompatible
/// (see [`Contributor::merge`]).
pub fn consolidate(
    bounds: DeaggBounds,
    source_sets: Vec<Contributor>,
) -> PshaResult<(DeaggResult, Vec<Contributor>)> {
    let mut total = DeaggResult::new(bounds);
    for set in &source_sets {
        total.merge(set.dataset());
    }
    Ok((total, source_sets))
}

/// Merge two lists of source-set contributors (e.g. results from two
/// calculation batches covering disjoint sources) into one, by name.
///
/// # Errors
///
/// Propagates [`crate::error::PshaError::ComputationFailed`] on a name
/// collision between structurally incompatible contributors.
pub fn merge_source_set_lists(
    mut base: Vec<Contributor>,
    additions: Vec<Contributor>,
) -> PshaResult<Vec<Contributor>> {
    for addition in additions {
        match base.iter_mut().find(|c| c.name() == addition.name()) {
            Some(existing) => existing.merge(addition)?,
            None => base.push(addition),
        }
    }
    Ok(base)
}

/// Sort a list of contributors by descending rate, the conventional
/// presentation order for a deaggregation report.
pub fn sort_by_rate_desc(contributors: &mut [Contributor]) {
    contributors.sort_by(|a, b| b.rate().partial_cmp(&a.rate()).unwrap_or(std::cmp::Ordering::Equal));
}

/// Build a leaf-level name used when a source set has no sub-source
/// breakdown worth keeping (e.g. a cluster or system set consolidated
/// straight to its own dataset).
#[must_use]
pub fn leaf_name(name: &str) -> Arc<str> {
    Arc::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deagg::contributor::Contributor;

    fn bounds() -> DeaggBounds {
        DeaggBounds {
            r_min: 0.0,
            r_max: 100.0,
            delta_r: 10.0,
            m_min: 5.0,
            m_max: 8.0,
            delta_m: 0.5,
            eps_min: -3.0,
            eps_max: 3.0,
            delta_eps: 1.0,
        }
    }

    fn leaf(name: &str, rate: f64) -> Contributor {
        let mut dataset = DeaggResult::new(bounds());
        dataset.add_total(25.0, 6.0, 0.0, rate);
        Contributor::Source {
            name: leaf_name(name),
            dataset,
        }
    }

    #[test]
    fn consolidate_sums_every_source_sets_rate() {
        let sets = vec![leaf("a", 1e-4), leaf("b", 2e-4)];
        let (total, _) = consolidate(bounds(), sets).unwrap();
        assert!((total.total().total_rate() - 3e-4).abs() < 1e-18);
    }

    #[test]
    fn sort_by_rate_desc_orders_highest_first() {
        let mut sets = vec![leaf("a", 1e-4), leaf("b", 5e-4), leaf("c", 2e-4)];
        sort_by_rate_desc(&mut sets);
        assert_eq!(sets[0].name(), "b");
        assert_eq!(sets[2].name(), "a");
    }
}
