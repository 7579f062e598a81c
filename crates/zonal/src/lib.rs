//! # HydroForce Zonal
//!
//! The zonal weight engine: builds the catchment → grid-cell crosswalk
//! ("weight map") by rasterizing catchment polygons onto a forcing grid,
//! then applies it to many time-stepped forcing files to produce
//! per-catchment meteorological series.
//!
//! Lifecycle: weights are built (or loaded) before any aggregation runs,
//! are immutable afterwards, and are shared read-only across aggregation
//! workers.

pub mod aggregate;
pub mod proj;
pub mod rasterize;
pub mod series;
pub mod weights;

pub use aggregate::{aggregate, zonal_means, AggregateOutcome, CatchmentSeries, ForcingSlice};
pub use proj::{resolve_projection, LccSphere, Projection};
pub use rasterize::rasterize_all_touched;
pub use series::{write_series, OutputFormat};
pub use weights::{WeightEntry, WeightMap, WEIGHTS_SCHEMA_VERSION};
