//! Error types for HydroForce

use thiserror::Error;

/// Main error type for HydroForce operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad or missing configuration. Raised before any work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// An identifier was not present in the table it was looked up in.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Polygon CRS does not match the grid CRS and no transform path exists.
    /// Silent mis-rasterization produces plausible but wrong weights, so this
    /// is always fatal.
    #[error("CRS mismatch: polygons are '{source_crs}', grid is '{grid_crs}'")]
    CrsMismatch { source_crs: String, grid_crs: String },

    /// Array shape differs from the grid shape the weights were built for.
    #[error("grid shape mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    ShapeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("invalid raster dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// GeoPackage read or geometry decode failure.
    #[error("geopackage error: {0}")]
    Gpkg(String),

    /// Weight file read/write or schema failure.
    #[error("weight file error: {0}")]
    Weights(String),

    /// A forcing file could not be read or is missing a requested variable.
    /// Callers processing batches usually downgrade this to a per-file skip.
    #[error("forcing file '{file}': {reason}")]
    Forcing { file: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a per-file forcing error.
    pub fn forcing(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Forcing {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for HydroForce operations
pub type Result<T> = std::result::Result<T, Error>;
