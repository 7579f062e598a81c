//! Hydrofabric data model
//!
//! A hydrofabric is the catchment + nexus + network dataset describing basin
//! topology. Catchments ("divides") are polygon drainage areas; nexuses are
//! the junction points their flow paths converge at. The directed network is
//! implied by the `toid` foreign keys on both tables and is never stored as
//! an explicit graph.

use geo_types::MultiPolygon;
use hydroforce_core::{Crs, Error, Result};
use std::collections::HashMap;

/// A drainage-area polygon, the unit of hydrologic accounting.
///
/// `id` follows the `cat-<n>` pattern; `toid` names the downstream nexus.
#[derive(Debug, Clone)]
pub struct Divide {
    pub id: String,
    pub toid: String,
    pub geometry: MultiPolygon<f64>,
}

/// A junction where one or more catchments converge.
///
/// `id` follows the `nex-<n>` pattern; `toid` names the downstream
/// catchment (possibly via its `wb-<n>` waterbody alias) or a terminal
/// marker for basin outlets.
#[derive(Debug, Clone)]
pub struct Nexus {
    pub id: String,
    pub toid: String,
}

/// Loaded hydrofabric layers plus the divide-layer CRS.
#[derive(Debug, Clone)]
pub struct Hydrofabric {
    divides: Vec<Divide>,
    nexuses: Vec<Nexus>,
    crs: Crs,
    divide_index: HashMap<String, usize>,
}

impl Hydrofabric {
    pub fn new(divides: Vec<Divide>, nexuses: Vec<Nexus>, crs: Crs) -> Self {
        let divide_index = divides
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self {
            divides,
            nexuses,
            crs,
            divide_index,
        }
    }

    pub fn divides(&self) -> &[Divide] {
        &self.divides
    }

    pub fn nexuses(&self) -> &[Nexus] {
        &self.nexuses
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn divide(&self, id: &str) -> Option<&Divide> {
        self.divide_index.get(id).map(|&i| &self.divides[i])
    }

    /// Error with the offending id unless the divide exists.
    pub fn require_divide(&self, id: &str) -> Result<&Divide> {
        self.divide(id).ok_or_else(|| Error::NotFound {
            kind: "catchment",
            id: id.to_string(),
        })
    }
}

/// Normalize a waterbody alias to its catchment id.
///
/// Nexus `toid` columns reference `wb-<n>` flowpath ids in some hydrofabric
/// releases; catchment and waterbody ids are 1-1, so tracing treats them as
/// the same key space.
pub fn waterbody_to_catchment(id: &str) -> String {
    match id.strip_prefix("wb-") {
        Some(n) => format!("cat-{}", n),
        None => id.to_string(),
    }
}

/// Inverse of [`waterbody_to_catchment`], used when subsetting flowpath
/// layers keyed by `wb-<n>`.
pub fn catchment_to_waterbody(id: &str) -> String {
    match id.strip_prefix("cat-") {
        Some(n) => format!("wb-{}", n),
        None => id.to_string(),
    }
}

/// Numeric suffix of a `cat-<n>` id, used in output file names.
pub fn catchment_suffix(id: &str) -> &str {
    match id.rsplit_once('-') {
        Some((_, n)) => n,
        None => id,
    }
}
