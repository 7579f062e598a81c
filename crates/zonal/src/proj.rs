//! Pure-Rust geographic → Lambert Conformal Conic projection
//! (Snyder 1987, USGS Prof. Paper 1395, pp. 104-110, spherical case).
//!
//! NWM grids are LCC projections on a perfect sphere, so hydrofabric
//! polygons stored in geographic coordinates can be projected onto the grid
//! without libproj. Anything that is neither already in the grid CRS nor
//! geographic has no transform path here and must be rejected loudly: a
//! polygon rasterized in the wrong CRS yields plausible-looking but wrong
//! weights.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use hydroforce_core::{Crs, Error, Result};

/// Spherical Lambert Conformal Conic (2SP) projection.
#[derive(Debug, Clone, Copy)]
pub struct LccSphere {
    n: f64,
    /// R * F (Snyder's F scaled by the sphere radius)
    rf: f64,
    rho0: f64,
    lon0: f64,
}

impl LccSphere {
    /// Build from standard parallels, origin latitude, central meridian
    /// (all degrees), and sphere radius (m).
    pub fn new(lat1_deg: f64, lat2_deg: f64, lat0_deg: f64, lon0_deg: f64, radius: f64) -> Self {
        let lat1 = lat1_deg.to_radians();
        let lat2 = lat2_deg.to_radians();
        let lat0 = lat0_deg.to_radians();

        let half = std::f64::consts::FRAC_PI_4;
        let t = |lat: f64| (half + lat / 2.0).tan();

        // Single-parallel cones degenerate the two-parallel formula
        let n = if (lat1 - lat2).abs() < 1e-12 {
            lat1.sin()
        } else {
            (lat1.cos() / lat2.cos()).ln() / (t(lat2) / t(lat1)).ln()
        };

        let rf = radius * lat1.cos() * t(lat1).powf(n) / n;
        let rho0 = rf / t(lat0).powf(n);

        Self {
            n,
            rf,
            rho0,
            lon0: lon0_deg.to_radians(),
        }
    }

    /// Project (longitude, latitude) in degrees to (x, y) in metres.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();

        let t = (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan();
        let rho = self.rf / t.powf(self.n);
        let theta = self.n * (lon - self.lon0);

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    /// Inverse projection: (x, y) in metres to (longitude, latitude) degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dy = self.rho0 - y;
        let rho = self.n.signum() * (x * x + dy * dy).sqrt();
        let theta = x.atan2(dy);

        let lon = theta / self.n + self.lon0;
        let lat = 2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - std::f64::consts::FRAC_PI_2;

        (lon.to_degrees(), lat.to_degrees())
    }
}

/// Transform path from polygon coordinates into grid coordinates.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    /// Polygon CRS already equals the grid CRS
    Identity,
    /// Geographic polygons onto an LCC grid
    Lcc(LccSphere),
}

impl Projection {
    pub fn transform_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => coord,
            Projection::Lcc(lcc) => {
                let (x, y) = lcc.project(coord.x, coord.y);
                Coord { x, y }
            }
        }
    }

    fn transform_ring(&self, ring: &LineString<f64>) -> LineString<f64> {
        LineString(ring.coords().map(|&c| self.transform_coord(c)).collect())
    }

    pub fn transform_polygon(&self, poly: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.transform_ring(poly.exterior()),
            poly.interiors()
                .iter()
                .map(|r| self.transform_ring(r))
                .collect(),
        )
    }

    pub fn transform_multipolygon(&self, geom: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        MultiPolygon(geom.0.iter().map(|p| self.transform_polygon(p)).collect())
    }
}

/// Pick the transform path from polygon CRS into grid CRS.
///
/// - equivalent CRS: identity
/// - geographic polygons with a known grid projection: LCC
/// - anything else: fatal [`Error::CrsMismatch`]
pub fn resolve_projection(
    polygon_crs: &Crs,
    grid_crs: &Crs,
    grid_projection: Option<&LccSphere>,
) -> Result<Projection> {
    if polygon_crs.is_equivalent(grid_crs) {
        return Ok(Projection::Identity);
    }
    if polygon_crs.is_geographic() {
        if let Some(lcc) = grid_projection {
            return Ok(Projection::Lcc(*lcc));
        }
    }
    Err(Error::CrsMismatch {
        source_crs: polygon_crs.identifier(),
        grid_crs: grid_crs.identifier(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// CONUS NWM grid parameters
    fn conus() -> LccSphere {
        LccSphere::new(30.0, 60.0, 40.0, -97.0, 6_370_000.0)
    }

    /// Puerto Rico NWM grid: single-parallel cone
    fn puertorico() -> LccSphere {
        LccSphere::new(18.1, 18.1, 18.1, -65.91, 6_370_000.0)
    }

    #[test]
    fn test_origin_projects_to_zero() {
        let (x, y) = conus().project(-97.0, 40.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_central_meridian_stays_vertical() {
        let (x, _) = conus().project(-97.0, 35.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        // West of the meridian is negative x
        let (x_west, _) = conus().project(-100.0, 35.0);
        assert!(x_west < 0.0);
    }

    #[test]
    fn test_meridian_degree_spacing() {
        // One degree of latitude along the central meridian is close to
        // R * pi/180 = 111.2 km; conformal scale distortion stays small
        // between the standard parallels.
        let lcc = conus();
        let (_, y40) = lcc.project(-97.0, 40.0);
        let (_, y41) = lcc.project(-97.0, 41.0);
        let spacing = y41 - y40;
        assert!(
            (100_000.0..120_000.0).contains(&spacing),
            "1 degree spacing {} m out of range",
            spacing
        );
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let lcc = conus();
        for &(lon, lat) in &[
            (-97.0, 40.0),
            (-80.2, 25.8),
            (-122.3, 47.6),
            (-67.0, 45.0),
            (-106.5, 31.8),
        ] {
            let (x, y) = lcc.project(lon, lat);
            let (lon2, lat2) = lcc.inverse(x, y);
            assert_relative_eq!(lon, lon2, epsilon = 1e-9);
            assert_relative_eq!(lat, lat2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_parallel_roundtrip() {
        let lcc = puertorico();
        let (x, y) = lcc.project(-66.5, 18.2);
        let (lon, lat) = lcc.inverse(x, y);
        assert_relative_eq!(lon, -66.5, epsilon = 1e-9);
        assert_relative_eq!(lat, 18.2, epsilon = 1e-9);
    }

    #[test]
    fn test_resolve_identity_for_equivalent_crs() {
        let grid = Crs::from_wkt("PROJCS[\"Lambert_Conformal_Conic\"]");
        let polys = Crs::from_wkt("PROJCS[\"Lambert_Conformal_Conic\"]");
        let proj = resolve_projection(&polys, &grid, None).unwrap();
        assert!(matches!(proj, Projection::Identity));
    }

    #[test]
    fn test_resolve_lcc_for_geographic_polygons() {
        let grid = Crs::from_wkt("PROJCS[\"Lambert_Conformal_Conic\"]");
        let proj = resolve_projection(&Crs::wgs84(), &grid, Some(&conus())).unwrap();
        assert!(matches!(proj, Projection::Lcc(_)));
    }

    #[test]
    fn test_resolve_rejects_projected_mismatch() {
        let grid = Crs::from_wkt("PROJCS[\"Lambert_Conformal_Conic\"]");
        // CONUS Albers polygons cannot be projected here
        let err = resolve_projection(&Crs::from_epsg(5070), &grid, Some(&conus())).unwrap_err();
        assert!(matches!(err, Error::CrsMismatch { .. }));
    }

    #[test]
    fn test_transform_polygon_maps_all_rings() {
        let lcc = conus();
        let ring = LineString(vec![
            Coord { x: -98.0, y: 39.0 },
            Coord { x: -97.0, y: 39.0 },
            Coord { x: -97.0, y: 40.0 },
            Coord { x: -98.0, y: 39.0 },
        ]);
        let poly = Polygon::new(ring, vec![]);
        let projected = Projection::Lcc(lcc).transform_polygon(&poly);
        // Projected coordinates are metres, far from degree magnitudes
        assert!(projected.exterior().0[0].x.abs() > 10_000.0);
    }
}
