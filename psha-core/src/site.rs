//! Site: the location and local-condition parameters a calculation runs at.

/// Site location and local ground conditions, supplying defaults (from
/// `CalcConfig`) for any field the caller leaves unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub lon: f64,
    pub lat: f64,
    pub vs30: f64,
    pub vs_inferred: bool,
    /// Depth to 1.0 km/s shear-wave velocity horizon, in km. `NaN` means
    /// "use the GMM default" (§3, §4.1).
    pub z1p0: f64,
    /// Depth to 2.5 km/s shear-wave velocity horizon, in km. `NaN` means
    /// "use the GMM default".
    pub z2p5: f64,
}

impl Site {
    #[must_use]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            vs30: 760.0,
            vs_inferred: true,
            z1p0: f64::NAN,
            z2p5: f64::NAN,
        }
    }

    #[must_use]
    pub fn with_vs30(mut self, vs30: f64) -> Self {
        self.vs30 = vs30;
        self
    }

    #[must_use]
    pub fn with_vs_inferred(mut self, vs_inferred: bool) -> Self {
        self.vs_inferred = vs_inferred;
        self
    }

    #[must_use]
    pub fn with_z1p0(mut self, z1p0: f64) -> Self {
        self.z1p0 = z1p0;
        self
    }

    #[must_use]
    pub fn with_z2p5(mut self, z2p5: f64) -> Self {
        self.z2p5 = z2p5;
        self
    }
}
