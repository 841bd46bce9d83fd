//! # `psha_core`
//!
//! **An asynchronous probabilistic seismic hazard analysis (PSHA) pipeline:
//! hazard curves and deaggregation over an injected source model and
//! ground-motion model set.**
//!
//! This crate computes hazard curves and deaggregations; it does not parse
//! source models, read configuration files, or write results anywhere. The
//! seismic source model, the site's geometry library, and the concrete
//! ground-motion equations are all supplied by the caller through the
//! traits in [`model`] and [`gmm`].
//!
//! ## Module overview
//!
//! - [`site`] — the location and local ground conditions a calculation runs at.
//! - [`model`] — the `HazardModel`/`SourceSet`/`Source`/`Rupture` contracts an
//!   external source model implements.
//! - [`gmm`] — the `GroundMotionModel` contract and the `GmmSet` container.
//! - [`imt`] — intensity measure type tags.
//! - [`xy`] — the shared-x-axis curve representation everything else builds on.
//! - [`input`] — `HazardInput`/`InputList`, the flat representation fed to GMMs.
//! - [`ground_motions`] — per-GMM mean/sigma tables.
//! - [`exceedance`] — the exceedance models folding ground-motion uncertainty
//!   into a curve.
//! - [`curves`] — `HazardCurves`, `HazardCurveSet`, and the final `Hazard` result.
//! - [`transform`] — the standard per-source pipeline stages.
//! - [`cluster`] — the cluster-source pipeline (joint exceedance).
//! - [`system`] — the system-source pipeline (bulk inputs, partitioned curves).
//! - [`deagg`] — the deaggregation subsystem.
//! - [`config`] — `CalcConfig` and its builder.
//! - [`pipeline`] — async fan-out/fan-in orchestration entry points.
//! - [`error`] — the crate's closed error type.
//!
//! ## Parallelism
//!
//! Per-source-set fan-out and fan-in run on a [`tokio`](https://docs.rs/tokio)
//! runtime (see [`pipeline`]); within a source set, per-rupture ground-motion
//! evaluation and curve reduction use [`rayon`](https://docs.rs/rayon) for
//! data parallelism.
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0 ([Apache-2.0](http://www.apache.org/licenses/LICENSE-2.0))
//!
//! ---
//!
//! ```text
//! Copyright 2025 Andrey Stepnov, GEOPHYSTECH LLC
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.
//! ```
//! ---

pub mod cluster;
pub mod config;
pub mod curves;
pub mod deagg;
pub mod error;
pub mod exceedance;
pub mod gmm;
pub mod ground_motions;
pub mod imt;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod site;
pub mod system;
pub mod transform;
pub mod xy;
