//! # HydroForce Core
//!
//! Shared types for the HydroForce hydrofabric forcing toolkit.
//!
//! This crate provides:
//! - `GridSpec`: reference grid definition (shape + transform + CRS)
//! - `GeoTransform`: affine georeferencing for north-up grids
//! - `Crs`: coordinate reference system handling
//! - `VariableStack`: stacked per-file variable buffer
//! - The workspace-wide error taxonomy

pub mod crs;
pub mod error;
pub mod raster;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{GeoTransform, GridSpec, VariableStack};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, GridSpec, VariableStack};
}
