//! Reference grid definition
//!
//! A `GridSpec` is the shape, georeferencing, and CRS of a forcing grid,
//! without any pixel data. Weight maps are built against a `GridSpec` and
//! every forcing array is validated against it before aggregation.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use serde::{Deserialize, Serialize};

/// Shape, transform, and CRS of a fixed raster grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    crs: Crs,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform, crs: Crs) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            transform,
            crs,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Error unless (rows, cols) equals this grid's shape.
    pub fn check_shape(&self, rows: usize, cols: usize) -> Result<()> {
        if rows != self.rows || cols != self.cols {
            return Err(Error::ShapeMismatch {
                er: self.rows,
                ec: self.cols,
                ar: rows,
                ac: cols,
            });
        }
        Ok(())
    }
}
