//! Affine georeferencing for north-up grids
//!
//! NWM forcing grids (and every grid this toolkit consumes) are north-up:
//! no rotation terms, positive pixel width, negative pixel height. The
//! transform maps pixel (col, row) to projected (x, y) coordinates.

use serde::{Deserialize, Serialize};

/// North-up affine transform for a raster grid.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height     (pixel_height < 0)
/// ```
///
/// `origin_x`/`origin_y` are the coordinates of the *outer corner* of the
/// upper-left pixel, GDAL-style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X (positive)
    pub pixel_width: f64,
    /// Cell size in Y (negative for north-up grids)
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build from cell-center coordinate axes, as stored in NWM NetCDF files.
    ///
    /// `x0`/`y0` are the centers of the first column/row; `dx`/`dy` the cell
    /// spacing along each axis (`dy` negative when rows run north to south).
    pub fn from_cell_centers(x0: f64, y0: f64, dx: f64, dy: f64) -> Self {
        Self {
            origin_x: x0 - dx / 2.0,
            origin_y: y0 - dy / 2.0,
            pixel_width: dx,
            pixel_height: dy,
        }
    }

    /// Coordinates of the center of pixel (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates (col, row) of a projected point.
    ///
    /// Use `.floor()` to get integer indices; values outside
    /// `[0, cols) x [0, rows)` are off the grid.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let col = (x - self.origin_x) / self.pixel_width;
        let row = (y - self.origin_y) / self.pixel_height;
        (col, row)
    }

    /// Cell size, assuming square pixels
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Bounding box (min_x, min_y, max_x, max_y) for a grid of `cols` x `rows`
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let x_end = self.origin_x + cols as f64 * self.pixel_width;
        let y_end = self.origin_y + rows as f64 * self.pixel_height;
        (
            self.origin_x.min(x_end),
            self.origin_y.min(y_end),
            self.origin_x.max(x_end),
            self.origin_y.max(y_end),
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
