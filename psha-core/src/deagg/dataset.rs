//! `DeaggDataset`: a 3-D binned rate accumulator over distance, magnitude,
//! and epsilon, plus the residual (rate from contributions outside the
//! bounded grid) and rate-weighted mean statistics (§4.5, §8 scenario 3).

/// Bin edges for a deaggregation grid. Bins are half-open `[lo, lo+delta)`,
/// except the last bin in each dimension which also accepts values equal
/// to the upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeaggBounds {
    pub r_min: f64,
    pub r_max: f64,
    pub delta_r: f64,
    pub m_min: f64,
    pub m_max: f64,
    pub delta_m: f64,
    pub eps_min: f64,
    pub eps_max: f64,
    pub delta_eps: f64,
}

impl DeaggBounds {
    #[must_use]
    pub fn n_r(&self) -> usize {
        (((self.r_max - self.r_min) / self.delta_r).round() as usize).max(1)
    }

    #[must_use]
    pub fn n_m(&self) -> usize {
        (((self.m_max - self.m_min) / self.delta_m).round() as usize).max(1)
    }

    #[must_use]
    pub fn n_eps(&self) -> usize {
        (((self.eps_max - self.eps_min) / self.delta_eps).round() as usize).max(1)
    }

    fn index(value: f64, lo: f64, hi: f64, delta: f64, n: usize) -> Option<usize> {
        if value < lo || value > hi {
            return None;
        }
        let i = ((value - lo) / delta).floor() as usize;
        Some(i.min(n - 1))
    }

    #[must_use]
    pub fn r_index(&self, r: f64) -> Option<usize> {
        Self::index(r, self.r_min, self.r_max, self.delta_r, self.n_r())
    }

    #[must_use]
    pub fn m_index(&self, m: f64) -> Option<usize> {
        Self::index(m, self.m_min, self.m_max, self.delta_m, self.n_m())
    }

    /// Bin index for `eps`, *clamped* into the extremal bin (`0` or
    /// `n_eps() - 1`) rather than treated as out-of-range: unlike distance
    /// and magnitude, epsilon never contributes to `residual` (§4.5, §8
    /// scenario 3).
    #[must_use]
    pub fn eps_index(&self, eps: f64) -> usize {
        if self.delta_eps <= 0.0 {
            return 0;
        }
        let clamped = eps.clamp(self.eps_min, self.eps_max);
        let i = ((clamped - self.eps_min) / self.delta_eps).floor() as usize;
        i.min(self.n_eps() - 1)
    }
}

/// A single source's (or a consolidated total's) binned deaggregation
/// result for one target IML.
#[derive(Debug, Clone)]
pub struct DeaggDataset {
    bounds: DeaggBounds,
    bins: Vec<f64>,
    residual: f64,
    total_rate: f64,
    r_weighted: f64,
    m_weighted: f64,
    eps_weighted: f64,
}

impl DeaggDataset {
    #[must_use]
    pub fn new(bounds: DeaggBounds) -> Self {
        let n = bounds.n_r() * bounds.n_m() * bounds.n_eps();
        Self {
            bounds,
            bins: vec![0.0; n],
            residual: 0.0,
            total_rate: 0.0,
            r_weighted: 0.0,
            m_weighted: 0.0,
            eps_weighted: 0.0,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> DeaggBounds {
        self.bounds
    }

    fn flat_index(&self, ir: usize, im: usize, ie: usize) -> usize {
        (ir * self.bounds.n_m() + im) * self.bounds.n_eps() + ie
    }

    /// Add one rupture's rate contribution at distance `r`, magnitude `m`,
    /// and epsilon `eps`. Contributions with `r` or `m` outside the grid's
    /// bounds add to `residual` rather than a bin; `eps` out of bounds is
    /// clamped into the nearest extremal bin instead, so it is never what
    /// routes a contribution to `residual` (§4.5, §8 scenario 3). Either
    /// way, every contribution always counts toward the rate-weighted mean
    /// statistics (r̄, m̄, ε̄), which summarize the calculation's full
    /// contribution set, not just what was binned.
    pub fn add(&mut self, r: f64, m: f64, eps: f64, rate: f64) {
        if rate <= 0.0 {
            return;
        }
        self.total_rate += rate;
        self.r_weighted += rate * r;
        self.m_weighted += rate * m;
        self.eps_weighted += rate * eps;

        match (self.bounds.r_index(r), self.bounds.m_index(m)) {
            (Some(ir), Some(im)) => {
                let ie = self.bounds.eps_index(eps);
                let idx = self.flat_index(ir, im, ie);
                self.bins[idx] += rate;
            }
            _ => self.residual += rate,
        }
    }

    #[must_use]
    pub fn bin(&self, ir: usize, im: usize, ie: usize) -> f64 {
        self.bins[self.flat_index(ir, im, ie)]
    }

    #[must_use]
    pub fn residual(&self) -> f64 {
        self.residual
    }

    #[must_use]
    pub fn total_rate(&self) -> f64 {
        self.total_rate
    }

    #[must_use]
    pub fn r_bar(&self) -> f64 {
        if self.total_rate <= 0.0 {
            0.0
        } else {
            self.r_weighted / self.total_rate
        }
    }

    #[must_use]
    pub fn m_bar(&self) -> f64 {
        if self.total_rate <= 0.0 {
            0.0
        } else {
            self.m_weighted / self.total_rate
        }
    }

    #[must_use]
    pub fn eps_bar(&self) -> f64 {
        if self.total_rate <= 0.0 {
            0.0
        } else {
            self.eps_weighted / self.total_rate
        }
    }

    /// Sum of every bin plus the residual; should equal `total_rate` within
    /// floating-point tolerance (§8 scenario 3's binned/residual invariant).
    #[must_use]
    pub fn binned_plus_residual(&self) -> f64 {
        self.bins.iter().sum::<f64>() + self.residual
    }

    /// Combine another dataset's contributions into this one, bin-by-bin.
    ///
    /// # Panics
    ///
    /// Panics if the two datasets' bounds differ.
    pub fn merge(&mut self, other: &DeaggDataset) {
        assert_eq!(self.bounds, other.bounds, "DeaggDataset::merge: bounds mismatch");
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            *a += b;
        }
        self.residual += other.residual;
        self.total_rate += other.total_rate;
        self.r_weighted += other.r_weighted;
        self.m_weighted += other.m_weighted;
        self.eps_weighted += other.eps_weighted;
    }
}

/// A deaggregation result carrying both the GMM-weighted total binned
/// dataset and each individual GMM's own binned dataset (§4.5, mirroring
/// `curves::HazardCurves`'s total/by-GMM split).
#[derive(Debug, Clone)]
pub struct DeaggResult {
    bounds: DeaggBounds,
    total: DeaggDataset,
    by_gmm: std::collections::HashMap<String, DeaggDataset>,
}

impl DeaggResult {
    #[must_use]
    pub fn new(bounds: DeaggBounds) -> Self {
        Self {
            bounds,
            total: DeaggDataset::new(bounds),
            by_gmm: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> DeaggBounds {
        self.bounds
    }

    #[must_use]
    pub fn total(&self) -> &DeaggDataset {
        &self.total
    }

    #[must_use]
    pub fn by_gmm(&self, gmm_id: &str) -> Option<&DeaggDataset> {
        self.by_gmm.get(gmm_id)
    }

    #[must_use]
    pub fn gmm_ids(&self) -> impl Iterator<Item = &str> {
        self.by_gmm.keys().map(String::as_str)
    }

    pub fn add_total(&mut self, r: f64, m: f64, eps: f64, rate: f64) {
        self.total.add(r, m, eps, rate);
    }

    pub fn add_gmm(&mut self, gmm_id: &str, r: f64, m: f64, eps: f64, rate: f64) {
        self.by_gmm
            .entry(gmm_id.to_string())
            .or_insert_with(|| DeaggDataset::new(self.bounds))
            .add(r, m, eps, rate);
    }

    /// Combine another result's total and per-GMM datasets into this one.
    ///
    /// # Panics
    ///
    /// Panics if the two results' bounds differ.
    pub fn merge(&mut self, other: &DeaggResult) {
        assert_eq!(self.bounds, other.bounds, "DeaggResult::merge: bounds mismatch");
        self.total.merge(&other.total);
        for (gmm_id, dataset) in &other.by_gmm {
            self.by_gmm
                .entry(gmm_id.clone())
                .or_insert_with(|| DeaggDataset::new(self.bounds))
                .merge(dataset);
        }
    }
}
