//! `HazardInput` / `InputList`: the flat, source-set-agnostic representation
//! a `GroundMotionModel` is evaluated against (§3, §4.1).

use crate::model::SourceSetId;
use std::sync::Arc;

/// One rupture/site pair, reduced to exactly the fields a GMM needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardInput {
    pub rate: f64,
    pub mw: f64,
    pub r_jb: f64,
    pub r_rup: f64,
    pub r_x: f64,
    pub dip: f64,
    pub width: f64,
    pub z_top: f64,
    pub z_hyp: f64,
    pub rake: f64,
    pub vs30: f64,
    pub vs_inferred: bool,
    pub z1p0: f64,
    pub z2p5: f64,
}

/// Identifies which source set an `InputList` was generated from, carried
/// through the pipeline for attribution in deaggregation contributors.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub source_set_id: SourceSetId,
    pub source_set_name: Arc<str>,
}

impl ParentRef {
    #[must_use]
    pub fn new(source_set_id: SourceSetId, source_set_name: impl Into<Arc<str>>) -> Self {
        Self {
            source_set_id,
            source_set_name: source_set_name.into(),
        }
    }
}

/// An ordered list of `HazardInput`s sharing a parent source set.
///
/// Order is significant: ground-motion tables and deaggregation bins are
/// later zipped back against this same ordering (§4.1, §4.5).
#[derive(Debug, Clone)]
pub struct InputList {
    parent: ParentRef,
    inputs: Vec<HazardInput>,
}

impl InputList {
    #[must_use]
    pub fn new(parent: ParentRef, inputs: Vec<HazardInput>) -> Self {
        Self { parent, inputs }
    }

    #[must_use]
    pub fn parent(&self) -> &ParentRef {
        &self.parent
    }

    #[must_use]
    pub fn inputs(&self) -> &[HazardInput] {
        &self.inputs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The minimum Joyner-Boore distance across every input, used to key
    /// `GmmSet::weight_map` (§4.2).
    #[must_use]
    pub fn min_distance(&self) -> f64 {
        self.inputs
            .iter()
            .map(|i| i.r_jb)
            .fold(f64::INFINITY, f64::min)
    }

    /// Split into `n` contiguous chunks of roughly equal size, each carrying
    /// a clone of the same parent reference. Used by the system-source
    /// pipeline to parallelize curve computation over an already-built
    /// bulk `InputList` while preserving the partition-invariance property
    /// (§4.6, §8 scenario 5): the sum of per-chunk curves equals the curve
    /// computed from the unpartitioned list.
    ///
    /// Returns fewer than `n` chunks if there are fewer inputs than `n`;
    /// returns a single chunk if `n <= 1`.
    #[must_use]
    pub fn partition_chunks(&self, n: usize) -> Vec<InputList> {
        if n <= 1 || self.inputs.is_empty() {
            return vec![self.clone()];
        }
        let n = n.min(self.inputs.len());
        let base = self.inputs.len() / n;
        let rem = self.inputs.len() % n;
        let mut chunks = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let size = base + usize::from(i < rem);
            if size == 0 {
                continue;
            }
            chunks.push(InputList::new(
                self.parent.clone(),
                self.inputs[start..start + size].to_vec(),
            ));
            start += size;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(r_jb: f64) -> HazardInput {
        HazardInput {
            rate: 1e-4,
            mw: 6.5,
            r_jb,
            r_rup: r_jb + 1.0,
            r_x: r_jb,
            dip: 90.0,
            width: 10.0,
            z_top: 0.0,
            z_hyp: 8.0,
            rake: 0.0,
            vs30: 760.0,
            vs_inferred: true,
            z1p0: f64::NAN,
            z2p5: f64::NAN,
        }
    }

    fn parent() -> ParentRef {
        ParentRef::new(SourceSetId(1), "test-set")
    }

    #[test]
    fn min_distance_is_the_closest_input() {
        let list = InputList::new(parent(), vec![input(30.0), input(5.0), input(50.0)]);
        assert_eq!(list.min_distance(), 5.0);
    }

    #[test]
    fn partition_chunks_covers_every_input_exactly_once() {
        let inputs: Vec<_> = (0..10).map(|i| input(i as f64)).collect();
        let list = InputList::new(parent(), inputs.clone());
        let chunks = list.partition_chunks(3);
        assert_eq!(chunks.len(), 3);
        let total: usize = chunks.iter().map(InputList::len).sum();
        assert_eq!(total, inputs.len());
        let flattened: Vec<_> = chunks.iter().flat_map(|c| c.inputs().to_vec()).collect();
        assert_eq!(flattened, inputs);
    }

    #[test]
    fn partition_chunks_with_n_le_1_returns_single_chunk() {
        let list = InputList::new(parent(), vec![input(1.0), input(2.0)]);
        assert_eq!(list.partition_chunks(1).len(), 1);
        assert_eq!(list.partition_chunks(0).len(), 1);
    }
}
