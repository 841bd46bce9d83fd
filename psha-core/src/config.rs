//! Calculation configuration: the one in-memory, in-scope piece of "config
//! parsing" this crate owns (§1, §4.1, §9). Deserializing a config from a
//! file or request body is the caller's job; this module only validates
//! and assembles an already-parsed set of fields into an immutable
//! `CalcConfig`, generalizing the teacher's static named-configuration
//! registry into a per-calculation instance builder.

use crate::deagg::DeaggBounds;
use crate::error::{PshaError, PshaResult};
use crate::exceedance::ExceedanceModel;
use crate::imt::Imt;
use crate::xy::XySequence;
use std::collections::HashMap;

/// How many worker threads the pipeline's blocking/CPU-bound stages may
/// use, feeding both `tokio::runtime::Builder::worker_threads` and
/// `rayon::ThreadPoolBuilder::num_threads` (§4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadCount {
    /// Use exactly one thread — useful for deterministic, single-threaded
    /// runs.
    One,
    /// Use half the available cores (rounded down, at least 1).
    Half,
    /// Use every available core minus two (at least 1) — leaves headroom
    /// for the async runtime's own driver threads.
    NMinusTwo,
    /// Use every available core (`std::thread::available_parallelism`).
    All,
}

impl ThreadCount {
    fn available() -> usize {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Resolve to a concrete thread count, always at least 1.
    #[must_use]
    pub fn resolve(&self) -> usize {
        let cores = Self::available();
        match self {
            ThreadCount::One => 1,
            ThreadCount::Half => (cores / 2).max(1),
            ThreadCount::NMinusTwo => cores.saturating_sub(2).max(1),
            ThreadCount::All => cores,
        }
    }
}

/// Whether curve y-values are annual exceedance rates or (for short
/// calculation windows) probabilities of exceedance (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    AnnualRate,
    Probability,
}

/// Which curve types a caller wants persisted; `Total` is always saved
/// regardless of what's requested here (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    Total,
    ByGmm,
}

/// Site-local parameters used whenever a calculation's `Site` leaves a
/// field unset (§4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteDefaults {
    pub vs30: f64,
    pub vs_inferred: bool,
    pub z1p0: f64,
    pub z2p5: f64,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            vs30: 760.0,
            vs_inferred: true,
            z1p0: f64::NAN,
            z2p5: f64::NAN,
        }
    }
}

/// Scheduling and partitioning knobs for the async pipeline (§4.1, §5, §7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub optimize_grids: bool,
    pub collapse_mfds: bool,
    pub system_partition: usize,
    pub thread_count: ThreadCount,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            optimize_grids: true,
            collapse_mfds: true,
            system_partition: 1000,
            thread_count: ThreadCount::All,
        }
    }
}

/// Output persistence settings (§4.1, §6). What to do with these settings
/// (writing files, buffering I/O) is an external collaborator's job; this
/// crate only carries them through `CalcConfig` for that collaborator to
/// read back.
#[derive(Debug, Clone, Default)]
pub struct OutputSettings {
    pub output_dir: Option<String>,
    pub curve_types: Vec<CurveType>,
    pub flush_limit: usize,
}

impl OutputSettings {
    /// `curve_types` plus `Total`, deduplicated — `Total` is always saved
    /// regardless of what was requested (§4.1).
    #[must_use]
    pub fn effective_curve_types(&self) -> Vec<CurveType> {
        let mut types = vec![CurveType::Total];
        for &t in &self.curve_types {
            if !types.contains(&t) {
                types.push(t);
            }
        }
        types
    }
}

/// Immutable, validated configuration shared (via `Arc`/`Clone`) across
/// every task in one calculation (§4.1, §5).
#[derive(Debug, Clone)]
pub struct CalcConfig {
    imts: Vec<Imt>,
    exceedance_model: ExceedanceModel,
    truncation_level: f64,
    gmm_uncertainty: bool,
    value_type: ValueType,
    model_curves: HashMap<Imt, XySequence>,
    log_model_curves: HashMap<Imt, XySequence>,
    site_defaults: SiteDefaults,
    performance: Performance,
    output: OutputSettings,
    deagg_bounds: Option<DeaggBounds>,
}

impl CalcConfig {
    #[must_use]
    pub fn imts(&self) -> &[Imt] {
        &self.imts
    }

    #[must_use]
    pub fn exceedance_model(&self) -> ExceedanceModel {
        self.exceedance_model
    }

    #[must_use]
    pub fn truncation_level(&self) -> f64 {
        self.truncation_level
    }

    #[must_use]
    pub fn thread_count(&self) -> ThreadCount {
        self.performance.thread_count
    }

    #[must_use]
    pub fn gmm_uncertainty(&self) -> bool {
        self.gmm_uncertainty
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[must_use]
    pub fn site_defaults(&self) -> SiteDefaults {
        self.site_defaults
    }

    #[must_use]
    pub fn performance(&self) -> Performance {
        self.performance
    }

    #[must_use]
    pub fn optimize_grids(&self) -> bool {
        self.performance.optimize_grids
    }

    #[must_use]
    pub fn collapse_mfds(&self) -> bool {
        self.performance.collapse_mfds
    }

    /// Batch size the system pipeline partitions its bulk `InputList` into
    /// (§4.6, §7). Never zero.
    #[must_use]
    pub fn system_partition(&self) -> usize {
        self.performance.system_partition.max(1)
    }

    #[must_use]
    pub fn output(&self) -> &OutputSettings {
        &self.output
    }

    #[must_use]
    pub fn deagg_bounds(&self) -> Option<&DeaggBounds> {
        self.deagg_bounds.as_ref()
    }

    /// Zero-filled curve template for `imt`, in linear (caller-facing) IML
    /// units.
    #[must_use]
    pub fn model_curve(&self, imt: Imt) -> Option<&XySequence> {
        self.model_curves.get(&imt)
    }

    /// Zero-filled curve template for `imt`, with a natural-log x-axis —
    /// the space every curve is actually computed in (§3).
    #[must_use]
    pub fn log_model_curve(&self, imt: Imt) -> Option<&XySequence> {
        self.log_model_curves.get(&imt)
    }

    /// Cheap clone — every field is either `Copy` or `Arc`-backed
    /// (`XySequence`'s x-axis).
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Apply `other`'s overrides on top of this configuration: every field
    /// `other` sets (`Some`) wins, every field it leaves unset (`None`)
    /// falls back to this configuration's own value.
    #[must_use]
    pub fn extend(&self, other: &CalcConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(model) = other.exceedance_model {
            next.exceedance_model = model;
        }
        if let Some(level) = other.truncation_level {
            next.truncation_level = level;
        }
        if let Some(enabled) = other.gmm_uncertainty {
            next.gmm_uncertainty = enabled;
        }
        if let Some(value_type) = other.value_type {
            next.value_type = value_type;
        }
        if let Some(site_defaults) = other.site_defaults {
            next.site_defaults = site_defaults;
        }
        if let Some(optimize_grids) = other.optimize_grids {
            next.performance.optimize_grids = optimize_grids;
        }
        if let Some(collapse_mfds) = other.collapse_mfds {
            next.performance.collapse_mfds = collapse_mfds;
        }
        if let Some(system_partition) = other.system_partition {
            next.performance.system_partition = system_partition;
        }
        if let Some(thread_count) = other.thread_count {
            next.performance.thread_count = thread_count;
        }
        if let Some(deagg_bounds) = other.deagg_bounds {
            next.deagg_bounds = Some(deagg_bounds);
        }
        next
    }
}

/// A sparse set of `CalcConfig` overrides for `CalcConfig::extend` (§4.1).
/// Every field is `None` by default, meaning "leave the base config's value
/// alone".
#[derive(Debug, Clone, Copy, Default)]
pub struct CalcConfigPatch {
    pub exceedance_model: Option<ExceedanceModel>,
    pub truncation_level: Option<f64>,
    pub gmm_uncertainty: Option<bool>,
    pub value_type: Option<ValueType>,
    pub site_defaults: Option<SiteDefaults>,
    pub optimize_grids: Option<bool>,
    pub collapse_mfds: Option<bool>,
    pub system_partition: Option<usize>,
    pub thread_count: Option<ThreadCount>,
    pub deagg_bounds: Option<DeaggBounds>,
}

/// One-shot builder for `CalcConfig`. `build` consumes the builder, so a
/// builder can never be reused after a successful or failed build.
pub struct CalcConfigBuilder {
    imls: HashMap<Imt, Vec<f64>>,
    exceedance_model: Option<ExceedanceModel>,
    truncation_level: f64,
    gmm_uncertainty: bool,
    value_type: ValueType,
    site_defaults: SiteDefaults,
    performance: Performance,
    output: OutputSettings,
    deagg_bounds: Option<DeaggBounds>,
}

impl CalcConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            imls: HashMap::new(),
            exceedance_model: None,
            truncation_level: 3.0,
            gmm_uncertainty: false,
            value_type: ValueType::AnnualRate,
            site_defaults: SiteDefaults::default(),
            performance: Performance::default(),
            output: OutputSettings::default(),
            deagg_bounds: None,
        }
    }

    /// A builder pre-populated with a small default PGA IML set and
    /// `TruncationOff`, so `with_defaults().build()` always succeeds —
    /// useful for tests and for callers that want a baseline config to
    /// `extend` rather than assemble field-by-field.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_imls(Imt::Pga, vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0])
            .with_exceedance_model(ExceedanceModel::TruncationOff)
    }

    /// Register the intensity-measure levels (the curve x-axis, linear
    /// units, strictly increasing) this calculation will evaluate for `imt`.
    #[must_use]
    pub fn with_imls(mut self, imt: Imt, imls: Vec<f64>) -> Self {
        self.imls.insert(imt, imls);
        self
    }

    #[must_use]
    pub fn with_exceedance_model(mut self, model: ExceedanceModel) -> Self {
        self.exceedance_model = Some(model);
        self
    }

    #[must_use]
    pub fn with_truncation_level(mut self, level: f64) -> Self {
        self.truncation_level = level;
        self
    }

    #[must_use]
    pub fn with_thread_count(mut self, thread_count: ThreadCount) -> Self {
        self.performance.thread_count = thread_count;
        self
    }

    #[must_use]
    pub fn with_gmm_uncertainty(mut self, enabled: bool) -> Self {
        self.gmm_uncertainty = enabled;
        self
    }

    #[must_use]
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    #[must_use]
    pub fn with_site_defaults(mut self, site_defaults: SiteDefaults) -> Self {
        self.site_defaults = site_defaults;
        self
    }

    #[must_use]
    pub fn with_performance(mut self, performance: Performance) -> Self {
        self.performance = performance;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputSettings) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_deagg_bounds(mut self, bounds: DeaggBounds) -> Self {
        self.deagg_bounds = Some(bounds);
        self
    }

    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PshaError::ConfigInvalid`] if no IMTs were registered, if
    /// any IMT's IML array is empty, or if an IML array is not strictly
    /// increasing.
    pub fn build(self) -> PshaResult<CalcConfig> {
        if self.imls.is_empty() {
            return Err(PshaError::ConfigInvalid {
                field: "imls",
                reason: "at least one IMT must be registered".to_string(),
            });
        }
        let exceedance_model = self
            .exceedance_model
            .ok_or_else(|| PshaError::ConfigInvalid {
                field: "exceedance_model",
                reason: "no exceedance model was set".to_string(),
            })?;

        let mut imts: Vec<Imt> = self.imls.keys().copied().collect();
        imts.sort();

        let mut model_curves = HashMap::with_capacity(imts.len());
        let mut log_model_curves = HashMap::with_capacity(imts.len());
        for imt in &imts {
            let x = &self.imls[imt];
            if x.is_empty() {
                return Err(PshaError::ConfigInvalid {
                    field: "imls",
                    reason: format!("IML array for {imt:?} is empty"),
                });
            }
            if !x.windows(2).all(|w| w[0] < w[1]) {
                return Err(PshaError::ConfigInvalid {
                    field: "imls",
                    reason: format!("IML array for {imt:?} is not strictly increasing"),
                });
            }
            let zeros = vec![0.0; x.len()];
            model_curves.insert(*imt, XySequence::new(x.clone(), zeros.clone()));
            let log_x: Vec<f64> = x.iter().map(|v| v.ln()).collect();
            log_model_curves.insert(*imt, XySequence::new(log_x, zeros));
        }

        Ok(CalcConfig {
            imts,
            exceedance_model,
            truncation_level: self.truncation_level,
            gmm_uncertainty: self.gmm_uncertainty,
            value_type: self.value_type,
            model_curves,
            log_model_curves,
            site_defaults: self.site_defaults,
            performance: self.performance,
            output: self.output,
            deagg_bounds: self.deagg_bounds,
        })
    }
}

impl Default for CalcConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_any_imts() {
        let err = CalcConfigBuilder::new()
            .with_exceedance_model(ExceedanceModel::TruncationOff)
            .build()
            .unwrap_err();
        assert!(matches!(err, PshaError::ConfigInvalid { field: "imls", .. }));
    }

    #[test]
    fn build_fails_on_non_increasing_imls() {
        let err = CalcConfigBuilder::new()
            .with_imls(Imt::Pga, vec![0.1, 0.1, 0.2])
            .with_exceedance_model(ExceedanceModel::TruncationOff)
            .build()
            .unwrap_err();
        assert!(matches!(err, PshaError::ConfigInvalid { .. }));
    }

    #[test]
    fn build_populates_log_model_curve() {
        let config = CalcConfigBuilder::new()
            .with_imls(Imt::Pga, vec![0.01, 0.1, 1.0])
            .with_exceedance_model(ExceedanceModel::TruncationOff)
            .build()
            .unwrap();
        let log_curve = config.log_model_curve(Imt::Pga).unwrap();
        assert!((log_curve.x()[0] - 0.01_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn thread_count_resolves_against_available_parallelism() {
        assert_eq!(ThreadCount::One.resolve(), 1);
        assert!(ThreadCount::All.resolve() >= 1);
        assert!(ThreadCount::Half.resolve() >= 1);
        assert!(ThreadCount::NMinusTwo.resolve() >= 1);
    }

    #[test]
    fn with_defaults_always_builds() {
        assert!(CalcConfigBuilder::with_defaults().build().is_ok());
    }

    #[test]
    fn copy_produces_an_equivalent_config() {
        let config = CalcConfigBuilder::with_defaults().build().unwrap();
        let copy = config.copy();
        assert_eq!(copy.imts(), config.imts());
    }

    #[test]
    fn extend_overrides_only_the_patched_fields() {
        let config = CalcConfigBuilder::with_defaults().build().unwrap();
        let patch = CalcConfigPatch {
            gmm_uncertainty: Some(true),
            ..Default::default()
        };
        let extended = config.extend(&patch);
        assert!(extended.gmm_uncertainty());
        assert_eq!(extended.exceedance_model(), config.exceedance_model());
        assert_eq!(extended.system_partition(), config.system_partition());
    }

    #[test]
    fn system_partition_defaults_to_one_thousand() {
        let config = CalcConfigBuilder::with_defaults().build().unwrap();
        assert_eq!(config.system_partition(), 1000);
    }
}
