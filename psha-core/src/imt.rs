//! Intensity measure types (IMTs).
//!
//! An IMT tags a spectral period or a broadband measure. IMTs are enumerable
//! and comparable by period so curve tables can be keyed and sorted
//! consistently across a calculation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A tag identifying a spectral period or broadband ground-motion measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Imt {
    /// Peak ground acceleration.
    Pga,
    /// Peak ground velocity.
    Pgv,
    /// Spectral acceleration at the given period, in seconds.
    Sa(f64),
}

impl Imt {
    /// Spectral period in seconds. Broadband measures are assigned a
    /// sentinel so they sort before any `Sa` period: `Pga` at 0.0 (matching
    /// the zero-period limit), `Pgv` at -1.0.
    #[must_use]
    pub fn period(&self) -> f64 {
        match self {
            Imt::Pga => 0.0,
            Imt::Pgv => -1.0,
            Imt::Sa(t) => *t,
        }
    }

    /// Clamp value (in natural-log physical units) used by
    /// `NSHM_CEUS_MAX_INTENSITY` truncation (§4.4): PGA = 3g, PGV = 400 cm/s,
    /// SA in [0, 0.75s] = 6g, SA beyond 0.75s = unclamped (+inf).
    #[must_use]
    pub fn nshm_ceus_clamp(&self) -> f64 {
        const G: f64 = 9.80665;
        match self {
            Imt::Pga => 3.0 * G,
            Imt::Pgv => 400.0,
            Imt::Sa(t) if *t <= 0.75 => 6.0 * G,
            Imt::Sa(_) => f64::INFINITY,
        }
    }
}

impl Eq for Imt {}

impl PartialOrd for Imt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Imt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.period()
            .partial_cmp(&other.period())
            .unwrap_or(Ordering::Equal)
    }
}

impl std::hash::Hash for Imt {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Imt::Pga => 0u8.hash(state),
            Imt::Pgv => 1u8.hash(state),
            Imt::Sa(t) => {
                2u8.hash(state);
                t.to_bits().hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_period_with_pgv_first_then_pga_then_sa() {
        let mut imts = vec![Imt::Sa(1.0), Imt::Pga, Imt::Pgv, Imt::Sa(0.2)];
        imts.sort();
        assert_eq!(imts, vec![Imt::Pgv, Imt::Pga, Imt::Sa(0.2), Imt::Sa(1.0)]);
    }

    #[test]
    fn nshm_clamp_boundaries() {
        assert!((Imt::Sa(0.75).nshm_ceus_clamp() - 6.0 * 9.80665).abs() < 1e-9);
        assert_eq!(Imt::Sa(1.0).nshm_ceus_clamp(), f64::INFINITY);
    }
}
