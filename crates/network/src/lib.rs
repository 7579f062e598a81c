//! # HydroForce Network
//!
//! Hydrofabric network model and operations:
//! - loading divide/nexus layers from a GeoPackage
//! - tracing the upstream closure of a catchment
//! - subsetting a hydrofabric to that closure

pub mod gpkg;
pub mod hydrofabric;
pub mod subset;
pub mod trace;
mod wkb;

pub use gpkg::GpkgReader;
pub use hydrofabric::{Divide, Hydrofabric, Nexus};
pub use subset::{subset_upstream, write_geojson, write_upstream_report, Subset};
pub use trace::{trace_upstream, upstream_counts, NetworkIndex, UpstreamIds};
