//! Closed error type surfaced from the calculation core.
//!
//! Configuration and builder errors are raised synchronously at construction;
//! everything else either recovers in-stage (see `deagg::dataset`) or surfaces
//! as a terminal [`PshaError`] from the top-level pipeline.

use thiserror::Error;

/// Error kinds surfaced from the PSHA calculation core.
#[derive(Debug, Error)]
pub enum PshaError {
    /// A configuration builder was missing a required field, given an
    /// out-of-range numeric value, or an unrecognized enum value.
    #[error("invalid configuration field `{field}`: {reason}")]
    ConfigInvalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable explanation of the violation.
        reason: String,
    },

    /// `build()` was called twice on a one-shot builder.
    #[error("builder `{builder}` was already built")]
    BuilderExhausted {
        /// Name of the builder type.
        builder: &'static str,
    },

    /// A dataset index helper was called with a value outside bounds that
    /// are not permitted to clamp (distance and magnitude indices; epsilon
    /// clamps instead of erroring).
    #[error("index out of range for `{axis}`: value {value} is outside [{lo}, {hi}]")]
    IndexOutOfRange {
        /// Axis name (`"distance"`, `"magnitude"`).
        axis: &'static str,
        /// The offending value.
        value: f64,
        /// Lower bound of the configured range.
        lo: f64,
        /// Upper bound of the configured range.
        hi: f64,
    },

    /// A concurrent pipeline stage was cancelled because a sibling or
    /// upstream stage failed.
    #[error("pipeline stage `{stage}` was cancelled")]
    PipelineCancelled {
        /// Name of the cancelled stage.
        stage: &'static str,
    },

    /// An underlying GMM or geometry operation (supplied by the caller)
    /// raised an error.
    #[error("computation failed in `{stage}`: {source}")]
    ComputationFailed {
        /// Name of the stage in which the failure originated.
        stage: &'static str,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience alias used throughout the crate.
pub type PshaResult<T> = Result<T, PshaError>;
