//! Deaggregation subsystem: binning each source's contribution to a
//! target intensity by distance, magnitude, and epsilon (§4.5).

pub mod consolidate;
pub mod contributor;
pub mod dataset;
pub mod driver;

pub use contributor::Contributor;
pub use dataset::{DeaggBounds, DeaggDataset, DeaggResult};
pub use driver::{deaggregate_model, deaggregate_source_set, resolve_target_iml};
