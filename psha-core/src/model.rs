//! Model contracts consumed by the pipeline: `HazardModel`, `SourceSet`,
//! `Source`, `Rupture`, `RuptureSurface` (§6).
//!
//! Source-model parsing is out of scope (§1): every concrete implementor of
//! these traits is supplied by the caller. The geometric surface library is
//! likewise external, consumed only through [`RuptureSurface::distance_to`].

use crate::gmm::GmmSet;
use crate::input::InputList;
use crate::site::Site;

/// Kind of source set, used to route a set through the right pipeline and
/// to key `Hazard::source_set_curves`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Fault,
    Grid,
    Slab,
    Cluster,
    System,
    Area,
}

/// Stable identifier for a source set, scoped to one `HazardModel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSetId(pub u64);

/// Stable identifier for a source, scoped to its parent source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// Rupture-to-site distance measures (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    /// Joyner-Boore distance (km).
    pub r_jb: f64,
    /// Rupture distance (km).
    pub r_rup: f64,
    /// Site-to-rupture-strike distance used for hanging-wall terms (km).
    pub r_x: f64,
}

/// External geometry contract (§1, §6): a rupture surface is consumed only
/// through this trait, never constructed or measured by this crate.
pub trait RuptureSurface: Send + Sync {
    fn distance_to(&self, site: &Site) -> Distance;
    fn dip(&self) -> f64;
    fn width(&self) -> f64;
    /// Depth to the top of rupture (km).
    fn z_top(&self) -> f64;
}

/// A single earthquake rupture within a source.
pub struct Rupture {
    /// Annual occurrence rate for ordinary sources. For cluster-source
    /// faults this field is overloaded to instead carry the rupture's
    /// magnitude-variant weight (§4.3, §9 "Design Notes" — deliberately not
    /// wrapped in an adapter type, per the spec's explicit guidance, since
    /// the downstream pipeline stages treat both identically).
    pub rate: f64,
    pub mag: f64,
    pub rake: f64,
    pub surface: Box<dyn RuptureSurface>,
}

/// An ordinary (fault, grid, slab, or area) source: an ordered list of
/// ruptures sharing a name/id.
pub trait Source: Send + Sync {
    fn id(&self) -> SourceId;
    fn name(&self) -> &str;
    fn ruptures(&self) -> &[Rupture];
}

/// A set of ordinary sources sharing a ground-motion model set and weight.
pub trait StandardSourceSet: Send + Sync {
    fn id(&self) -> SourceSetId;
    fn name(&self) -> &str;
    fn source_type(&self) -> SourceType;
    fn weight(&self) -> f64;
    fn gmm_set(&self) -> &GmmSet;
    /// Sources within this set relevant to `site`, omitting any beyond the
    /// GMM set's maximum distance (§6).
    fn sources_for(&self, site: &Site) -> Vec<Box<dyn Source>>;
}

/// One fault within a cluster source. Its ruptures carry magnitude-variant
/// weights in `Rupture::rate`, not occurrence rates (§4.3).
pub struct ClusterFault {
    pub id: SourceId,
    pub name: String,
    pub ruptures: Vec<Rupture>,
}

impl Source for ClusterFault {
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

/// One instance of a cluster of temporally-correlated faults at a site.
pub struct ClusterInstance {
    pub id: SourceId,
    pub name: String,
    /// The cluster's own annual occurrence rate, applied after faults are
    /// joint-exceedance combined (§4.3).
    pub rate: f64,
    pub faults: Vec<ClusterFault>,
}

/// A set of cluster sources.
pub trait ClusterSourceSet: Send + Sync {
    fn id(&self) -> SourceSetId;
    fn name(&self) -> &str;
    fn weight(&self) -> f64;
    fn gmm_set(&self) -> &GmmSet;
    fn clusters_for(&self, site: &Site) -> Vec<ClusterInstance>;
}

/// A large interconnected fault network whose inputs are generated in bulk
/// rather than source-by-source (§4.6).
pub trait SystemSourceSet: Send + Sync {
    fn id(&self) -> SourceSetId;
    fn name(&self) -> &str;
    fn weight(&self) -> f64;
    fn gmm_set(&self) -> &GmmSet;
    /// Compute the complete `InputList` for this set in one call.
    fn to_inputs(&self, site: &Site) -> InputList;
}

/// A source set, dispatched to the pipeline variant matching its kind.
pub enum SourceSetKind {
    Standard(Box<dyn StandardSourceSet>),
    Cluster(Box<dyn ClusterSourceSet>),
    System(Box<dyn SystemSourceSet>),
}

impl SourceSetKind {
    #[must_use]
    pub fn id(&self) -> SourceSetId {
        match self {
            SourceSetKind::Standard(s) => s.id(),
            SourceSetKind::Cluster(s) => s.id(),
            SourceSetKind::System(s) => s.id(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            SourceSetKind::Standard(s) => s.name(),
            SourceSetKind::Cluster(s) => s.name(),
            SourceSetKind::System(s) => s.name(),
        }
    }

    #[must_use]
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceSetKind::Standard(s) => s.source_type(),
            SourceSetKind::Cluster(_) => SourceType::Cluster,
            SourceSetKind::System(_) => SourceType::System,
        }
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            SourceSetKind::Standard(s) => s.weight(),
            SourceSetKind::Cluster(s) => s.weight(),
            SourceSetKind::System(s) => s.weight(),
        }
    }

    #[must_use]
    pub fn gmm_set(&self) -> &GmmSet {
        match self {
            SourceSetKind::Standard(s) => s.gmm_set(),
            SourceSetKind::Cluster(s) => s.gmm_set(),
            SourceSetKind::System(s) => s.gmm_set(),
        }
    }
}

/// The full seismic source model: an iterable of source sets.
pub struct HazardModel {
    pub source_sets: Vec<SourceSetKind>,
}

impl HazardModel {
    #[must_use]
    pub fn new(source_sets: Vec<SourceSetKind>) -> Self {
        Self { source_sets }
    }
}
