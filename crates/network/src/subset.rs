//! Hydrofabric subsetting
//!
//! Extracts the divide and nexus records belonging to an upstream closure
//! and writes them out as GeoJSON layer files, the exchange format the
//! NextGen model ingests. Flowpath-keyed layers use the `wb-` alias of each
//! catchment id.

use crate::hydrofabric::{catchment_to_waterbody, Divide, Hydrofabric, Nexus};
use crate::trace::UpstreamIds;
use hydroforce_core::{Crs, Error, Result};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Hydrofabric records restricted to one upstream closure.
#[derive(Debug, Clone)]
pub struct Subset {
    pub divides: Vec<Divide>,
    pub nexuses: Vec<Nexus>,
    pub crs: Crs,
}

impl Subset {
    /// `wb-` waterbody ids for the subset's catchments, for callers
    /// subsetting flowpath-keyed layers.
    pub fn waterbody_ids(&self) -> Vec<String> {
        self.divides
            .iter()
            .map(|d| catchment_to_waterbody(&d.id))
            .collect()
    }
}

/// Restrict a hydrofabric to the members of an upstream closure.
///
/// Record order follows the source hydrofabric, so output is deterministic
/// regardless of set iteration order.
pub fn subset_upstream(fabric: &Hydrofabric, ids: &UpstreamIds) -> Subset {
    let divides = fabric
        .divides()
        .iter()
        .filter(|d| ids.catchments.contains(&d.id))
        .cloned()
        .collect();
    let nexuses = fabric
        .nexuses()
        .iter()
        .filter(|n| ids.nexuses.contains(&n.id))
        .cloned()
        .collect();
    Subset {
        divides,
        nexuses,
        crs: fabric.crs().clone(),
    }
}

fn multipolygon_coords(divide: &Divide) -> Value {
    let polys: Vec<Value> = divide
        .geometry
        .0
        .iter()
        .map(|poly| {
            let mut rings: Vec<Value> = Vec::with_capacity(1 + poly.interiors().len());
            let ring_coords = |ring: &geo_types::LineString<f64>| -> Value {
                json!(ring
                    .coords()
                    .map(|c| json!([c.x, c.y]))
                    .collect::<Vec<_>>())
            };
            rings.push(ring_coords(poly.exterior()));
            for hole in poly.interiors() {
                rings.push(ring_coords(hole));
            }
            json!(rings)
        })
        .collect();
    json!(polys)
}

/// Write `divides.geojson` and `nexus.geojson` under `dir`.
///
/// Nexus features carry null geometry: only ids and topology are needed by
/// downstream consumers, and the point layer is not loaded here.
pub fn write_geojson(subset: &Subset, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let divide_features: Vec<Value> = subset
        .divides
        .iter()
        .map(|d| {
            json!({
                "type": "Feature",
                "id": d.id,
                "properties": { "id": d.id, "toid": d.toid },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": multipolygon_coords(d),
                },
            })
        })
        .collect();

    let nexus_features: Vec<Value> = subset
        .nexuses
        .iter()
        .map(|n| {
            json!({
                "type": "Feature",
                "id": n.id,
                "properties": { "id": n.id, "toid": n.toid },
                "geometry": Value::Null,
            })
        })
        .collect();

    let write_layer = |name: &str, features: Vec<Value>| -> Result<PathBuf> {
        let path = dir.join(name);
        let collection = json!({
            "type": "FeatureCollection",
            "features": features,
        });
        let body = serde_json::to_string_pretty(&collection)
            .map_err(|e| Error::Other(format!("geojson encoding failed: {}", e)))?;
        fs::write(&path, body)?;
        Ok(path)
    };

    let divides_path = write_layer("divides.geojson", divide_features)?;
    let nexus_path = write_layer("nexus.geojson", nexus_features)?;
    Ok((divides_path, nexus_path))
}

/// Write the per-catchment upstream count report, one `id : count` line per
/// catchment, in the order given (most-upstream-first from
/// [`crate::trace::upstream_counts`]).
pub fn write_upstream_report(counts: &[(String, usize)], path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    for (id, count) in counts {
        writeln!(file, "{} : {}", id, count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, LineString, MultiPolygon, Polygon};
    use std::collections::HashSet;

    fn square_divide(id: &str, toid: &str) -> Divide {
        let ring = LineString(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        Divide {
            id: id.to_string(),
            toid: toid.to_string(),
            geometry: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn fabric() -> Hydrofabric {
        Hydrofabric::new(
            vec![
                square_divide("cat-1", "nex-1"),
                square_divide("cat-2", "nex-1"),
                square_divide("cat-3", "nex-2"),
            ],
            vec![
                Nexus {
                    id: "nex-1".to_string(),
                    toid: "cat-3".to_string(),
                },
                Nexus {
                    id: "nex-2".to_string(),
                    toid: "cat-4".to_string(),
                },
            ],
            Crs::from_epsg(5070),
        )
    }

    fn closure(cats: &[&str], nexs: &[&str]) -> UpstreamIds {
        UpstreamIds {
            catchments: cats.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            nexuses: nexs.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
        }
    }

    #[test]
    fn test_subset_preserves_source_order() {
        let ids = closure(&["cat-3", "cat-1"], &["nex-1"]);
        let subset = subset_upstream(&fabric(), &ids);
        let got: Vec<_> = subset.divides.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(got, vec!["cat-1", "cat-3"]);
        assert_eq!(subset.nexuses.len(), 1);
        assert_eq!(subset.waterbody_ids(), vec!["wb-1", "wb-3"]);
    }

    #[test]
    fn test_geojson_layers_written() {
        let ids = closure(&["cat-1"], &["nex-1"]);
        let subset = subset_upstream(&fabric(), &ids);

        let dir = tempfile::tempdir().unwrap();
        let (divides_path, nexus_path) = write_geojson(&subset, dir.path()).unwrap();

        let divides: Value =
            serde_json::from_str(&fs::read_to_string(divides_path).unwrap()).unwrap();
        assert_eq!(divides["type"], "FeatureCollection");
        assert_eq!(divides["features"].as_array().unwrap().len(), 1);
        assert_eq!(divides["features"][0]["properties"]["toid"], "nex-1");
        // Five coordinate pairs in the exterior ring
        assert_eq!(
            divides["features"][0]["geometry"]["coordinates"][0][0]
                .as_array()
                .unwrap()
                .len(),
            5
        );

        let nexus: Value =
            serde_json::from_str(&fs::read_to_string(nexus_path).unwrap()).unwrap();
        assert!(nexus["features"][0]["geometry"].is_null());
    }

    #[test]
    fn test_upstream_report_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.txt");
        write_upstream_report(
            &[("cat-3".to_string(), 3), ("cat-1".to_string(), 1)],
            &path,
        )
        .unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "cat-3 : 3\ncat-1 : 1\n");
    }
}
