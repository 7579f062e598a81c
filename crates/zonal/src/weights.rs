//! Catchment weight maps
//!
//! A weight map is the precomputed crosswalk from catchment id to the grid
//! cells its polygon touches. It is built once per hydrofabric + grid
//! combination — the expensive step — then reused across every forcing
//! extraction until either input changes. On disk it is a JSON document
//! with a schema tag so the builder and the aggregator can evolve
//! independently:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "grid": { "rows": 3840, "cols": 4608, ... },
//!   "weights": { "cat-17": { "rows": [510, 510], "cols": [2201, 2202] } }
//! }
//! ```

use crate::proj::{resolve_projection, LccSphere};
use crate::rasterize::rasterize_all_touched;
use geo_types::MultiPolygon;
use hydroforce_core::{Crs, Error, GridSpec, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const WEIGHTS_SCHEMA_VERSION: u32 = 1;

/// Grid cells belonging to one catchment, as parallel row/col index lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl WeightEntry {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }
}

/// Catchment → grid-cell crosswalk for one reference grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMap {
    schema_version: u32,
    grid: GridSpec,
    weights: BTreeMap<String, WeightEntry>,
}

impl WeightMap {
    /// Rasterize catchment polygons onto the reference grid.
    ///
    /// Polygons are transformed into the grid CRS first; a polygon CRS with
    /// no transform path onto the grid fails fatally rather than producing
    /// silently wrong weights. Catchments rasterizing to zero cells (off
    /// the grid, or degenerate geometry) are kept as empty entries and
    /// reported through the returned map and a warning.
    pub fn build(
        polygons: &[(String, MultiPolygon<f64>)],
        polygon_crs: &Crs,
        grid: &GridSpec,
        grid_projection: Option<&LccSphere>,
    ) -> Result<Self> {
        let projection = resolve_projection(polygon_crs, grid.crs(), grid_projection)?;
        let (rows, cols) = grid.shape();

        let mut weights = BTreeMap::new();
        for (id, geometry) in polygons {
            let projected = projection.transform_multipolygon(geometry);
            let cells = rasterize_all_touched(&projected, grid.transform(), rows, cols);
            if cells.is_empty() {
                warn!(catchment = %id, "catchment rasterized to zero grid cells");
            }
            let mut entry = WeightEntry {
                rows: Vec::with_capacity(cells.len()),
                cols: Vec::with_capacity(cells.len()),
            };
            for (row, col) in cells {
                entry.rows.push(row);
                entry.cols.push(col);
            }
            weights.insert(id.clone(), entry);
        }

        Ok(Self {
            schema_version: WEIGHTS_SCHEMA_VERSION,
            grid: grid.clone(),
            weights,
        })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Number of catchments
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn entry(&self, catchment_id: &str) -> Option<&WeightEntry> {
        self.weights.get(catchment_id)
    }

    /// Catchment ids in deterministic (sorted) order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightEntry)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ids of catchments that rasterized to zero cells
    pub fn empty_catchments(&self) -> Vec<&str> {
        self.weights
            .iter()
            .filter(|(_, e)| e.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Write as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string(self)
            .map_err(|e| Error::Weights(format!("serialize failed: {}", e)))?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Read from JSON, rejecting unknown schema versions.
    pub fn load(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path).map_err(|e| {
            Error::Weights(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let map: WeightMap = serde_json::from_str(&body)
            .map_err(|e| Error::Weights(format!("cannot parse '{}': {}", path.display(), e)))?;
        if map.schema_version != WEIGHTS_SCHEMA_VERSION {
            return Err(Error::Weights(format!(
                "'{}' has schema version {}, this build reads {}",
                path.display(),
                map.schema_version,
                WEIGHTS_SCHEMA_VERSION
            )));
        }
        Ok(map)
    }
}
