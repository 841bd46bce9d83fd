//! Hierarchical, mergeable deaggregation contributor trees: the same
//! `SourceSet`/`Source`/`Cluster`/`System` shape as the model itself, so a
//! caller can attribute a deaggregation's rate back to individual sources
//! (§4.5, §6).

use crate::deagg::dataset::DeaggResult;
use crate::error::{PshaError, PshaResult};
use crate::model::SourceType;
use std::sync::Arc;

/// A node in the deaggregation contributor tree.
#[derive(Debug, Clone)]
pub enum Contributor {
    /// A leaf: one ordinary source's binned contribution.
    Source { name: Arc<str>, dataset: DeaggResult },
    /// One cluster instance's binned contribution (already joint-exceedance
    /// combined across its faults before deaggregation binning, §4.3).
    Cluster { name: Arc<str>, dataset: DeaggResult },
    /// A system source set's binned contribution.
    System { name: Arc<str>, dataset: DeaggResult },
    /// An internal node grouping the contributors within one source set.
    SourceSet {
        name: Arc<str>,
        source_type: SourceType,
        children: Vec<Contributor>,
        dataset: DeaggResult,
    },
}

impl Contributor {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Contributor::Source { name, .. }
            | Contributor::Cluster { name, .. }
            | Contributor::System { name, .. }
            | Contributor::SourceSet { name, .. } => name,
        }
    }

    #[must_use]
    pub fn dataset(&self) -> &DeaggResult {
        match self {
            Contributor::Source { dataset, .. }
            | Contributor::Cluster { dataset, .. }
            | Contributor::System { dataset, .. }
            | Contributor::SourceSet { dataset, .. } => dataset,
        }
    }

    #[must_use]
    pub fn rate(&self) -> f64 {
        self.dataset().total().total_rate()
    }

    /// Merge `other` into `self` in place. Leaves merge their datasets
    /// directly; `SourceSet` nodes merge their own dataset and recursively
    /// merge children with matching names, appending any child present in
    /// `other` but not in `self`.
    ///
    /// # Errors
    ///
    /// Returns [`PshaError::ComputationFailed`] if the two contributors are
    /// different variants or have different names — merging them would
    /// silently conflate two distinct sources.
    pub fn merge(&mut self, other: Contributor) -> PshaResult<()> {
        if self.name() != other.name() {
            return Err(mismatch("name", self.name(), other.name()));
        }
        match (self, other) {
            (Contributor::Source { dataset, .. }, Contributor::Source { dataset: od, .. })
            | (Contributor::Cluster { dataset, .. }, Contributor::Cluster { dataset: od, .. })
            | (Contributor::System { dataset, .. }, Contributor::System { dataset: od, .. }) => {
                dataset.merge(&od);
                Ok(())
            }
            (
                Contributor::SourceSet {
                    dataset, children, ..
                },
                Contributor::SourceSet {
                    dataset: od,
                    children: other_children,
                    ..
                },
            ) => {
                dataset.merge(&od);
                for other_child in other_children {
                    match children.iter_mut().find(|c| c.name() == other_child.name()) {
                        Some(existing) => existing.merge(other_child)?,
                        None => children.push(other_child),
                    }
                }
                Ok(())
            }
            (this, other) => Err(mismatch("variant", this.name(), other.name())),
        }
    }
}

fn mismatch(field: &'static str, a: &str, b: &str) -> PshaError {
    PshaError::ComputationFailed {
        stage: "deagg::Contributor::merge",
        source: format!("{field} mismatch: `{a}` vs `{b}`").into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deagg::dataset::DeaggBounds;

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

    #[test]
    fn merging_two_leaves_sums_their_datasets() {
        let mut d1 = DeaggResult::new(bounds());
        d1.add_total(25.0, 6.0, 0.0, 1e-4);
        let mut d2 = DeaggResult::new(bounds());
        d2.add_total(25.0, 6.0, 0.0, 2e-4);
        let mut a = Contributor::Source {
            name: Arc::from("fault-a"),
            dataset: d1,
        };
        let b = Contributor::Source {
            name: Arc::from("fault-a"),
            dataset: d2,
        };
        a.merge(b).unwrap();
        assert!((a.rate() - 3e-4).abs() < 1e-18);
    }

    #[test]
    fn merging_mismatched_names_errors() {
        let mut a = Contributor::Source {
            name: Arc::from("fault-a"),
            dataset: DeaggResult::new(bounds()),
        };
        let b = Contributor::Source {
            name: Arc::from("fault-b"),
            dataset: DeaggResult::new(bounds()),
        };
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn source_set_merge_appends_new_children() {
        let mut set_a = Contributor::SourceSet {
            name: Arc::from("set"),
            source_type: SourceType::Fault,
            children: vec![Contributor::Source {
                name: Arc::from("fault-a"),
                dataset: DeaggResult::new(bounds()),
            }],
            dataset: DeaggResult::new(bounds()),
        };
        let set_b = Contributor::SourceSet {
            name: Arc::from("set"),
            source_type: SourceType::Fault,
            children: vec![Contributor::Source {
                name: Arc::from("fault-b"),
                dataset: DeaggResult::new(bounds()),
            }],
            dataset: DeaggResult::new(bounds()),
        };
        set_a.merge(set_b).unwrap();
        if let Contributor::SourceSet { children, .. } = &set_a {
            assert_eq!(children.len(), 2);
        } else {
            unreachable!();
        }
    }
}
