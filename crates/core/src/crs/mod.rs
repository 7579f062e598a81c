//! Coordinate Reference System handling
//!
//! Hydrofabric layers carry an EPSG code from the GeoPackage `gpkg_srs`
//! table; NWM grids carry a WKT projection string with no EPSG code. `Crs`
//! holds whichever representation the source provides and supports the
//! equivalence check the weight builder depends on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT definition if known
    wkt: Option<String>,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Geographic (longitude/latitude) rather than projected coordinates.
    ///
    /// Geographic hydrofabric polygons can be projected onto an NWM grid;
    /// anything else must already match the grid CRS exactly.
    pub fn is_geographic(&self) -> bool {
        match self.epsg {
            // WGS84 and NAD83 geographic, the two codes hydrofabric
            // releases have shipped with
            Some(4326) | Some(4269) => true,
            Some(_) => false,
            None => match &self.wkt {
                Some(wkt) => {
                    let head = wkt.trim_start();
                    head.starts_with("GEOGCS") || head.starts_with("GEOGCRS")
                }
                None => false,
            },
        }
    }

    /// Check if two CRS are equivalent.
    ///
    /// EPSG codes compare numerically; WKT compares with whitespace
    /// normalized. Mixed representations are never considered equivalent.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            let norm = |s: &str| s.split_whitespace().collect::<String>();
            return norm(a) == norm(b);
        }
        false
    }

    /// Short string identifier for logs and error messages
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(40)]);
        }
        "unknown".to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
