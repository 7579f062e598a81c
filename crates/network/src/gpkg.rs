//! Hydrofabric GeoPackage reading
//!
//! NextGen hydrofabric releases ship as multi-layer GeoPackages. A
//! GeoPackage is a SQLite database with registry tables (`gpkg_contents`,
//! `gpkg_geometry_columns`, `gpkg_spatial_ref_sys`) alongside one table per
//! layer, so it is read here directly through rusqlite plus the blob
//! decoder in [`crate::wkb`].

use crate::hydrofabric::{Divide, Hydrofabric, Nexus};
use crate::wkb::decode_gpkg_geometry;
use hydroforce_core::{Crs, Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Divide (catchment) layer name
pub const DIVIDES_LAYER: &str = "divides";
/// Nexus (junction) layer name
pub const NEXUS_LAYER: &str = "nexus";

/// Read-only access to a hydrofabric GeoPackage.
#[derive(Debug)]
pub struct GpkgReader {
    conn: Connection,
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Gpkg(e.to_string())
}

impl GpkgReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound {
                kind: "geopackage",
                id: path.display().to_string(),
            });
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        Ok(Self { conn })
    }

    /// Layer names registered in `gpkg_contents`.
    pub fn list_layers(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM gpkg_contents ORDER BY table_name")
            .map_err(sql_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(names)
    }

    /// Geometry column name for a layer, from `gpkg_geometry_columns`.
    fn geometry_column(&self, layer: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT column_name FROM gpkg_geometry_columns WHERE table_name = ?1",
                [layer],
                |row| row.get::<_, String>(0),
            )
            .map_err(|_| Error::Gpkg(format!("layer '{}' has no registered geometry", layer)))
    }

    /// CRS of a layer via its `srs_id`.
    fn layer_crs(&self, layer: &str) -> Result<Crs> {
        let (org, code, definition): (String, i64, String) = self
            .conn
            .query_row(
                "SELECT s.organization, s.organization_coordsys_id, s.definition \
                 FROM gpkg_geometry_columns g \
                 JOIN gpkg_spatial_ref_sys s ON g.srs_id = s.srs_id \
                 WHERE g.table_name = ?1",
                [layer],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|_| Error::Gpkg(format!("no spatial reference for layer '{}'", layer)))?;

        if org.eq_ignore_ascii_case("epsg") && code > 0 {
            Ok(Crs::from_epsg(code as u32))
        } else {
            Ok(Crs::from_wkt(definition))
        }
    }

    /// Read the divide layer: id, downstream nexus id, polygon geometry.
    pub fn read_divides(&self) -> Result<(Vec<Divide>, Crs)> {
        let crs = self.layer_crs(DIVIDES_LAYER)?;
        let geom_col = self.geometry_column(DIVIDES_LAYER)?;
        let sql = format!(
            "SELECT id, toid, \"{}\" FROM \"{}\"",
            geom_col, DIVIDES_LAYER
        );
        let mut stmt = self.conn.prepare(&sql).map_err(sql_err)?;
        let mut rows = stmt.query([]).map_err(sql_err)?;

        let mut divides = Vec::new();
        while let Some(row) = rows.next().map_err(sql_err)? {
            let id: String = row.get(0).map_err(sql_err)?;
            let toid: Option<String> = row.get(1).map_err(sql_err)?;
            let blob: Vec<u8> = row.get(2).map_err(sql_err)?;
            let geometry = decode_gpkg_geometry(&blob)
                .map_err(|e| Error::Gpkg(format!("divide '{}': {}", id, e)))?;
            divides.push(Divide {
                id,
                toid: toid.unwrap_or_default(),
                geometry,
            });
        }
        Ok((divides, crs))
    }

    /// Read the nexus layer: id and downstream catchment/waterbody id.
    pub fn read_nexuses(&self) -> Result<Vec<Nexus>> {
        let sql = format!("SELECT id, toid FROM \"{}\"", NEXUS_LAYER);
        let mut stmt = self.conn.prepare(&sql).map_err(sql_err)?;
        let nexuses = stmt
            .query_map([], |row| {
                Ok(Nexus {
                    id: row.get(0)?,
                    toid: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })
            .map_err(sql_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(nexuses)
    }

    /// Read divides + nexus layers into a [`Hydrofabric`].
    pub fn read_hydrofabric(&self) -> Result<Hydrofabric> {
        let (divides, crs) = self.read_divides()?;
        let nexuses = self.read_nexuses()?;
        Ok(Hydrofabric::new(divides, nexuses, crs))
    }
}
