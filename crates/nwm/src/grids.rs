//! NWM grid projections
//!
//! Every NWM forcing grid is a spherical Lambert Conformal Conic projection
//! on a 6 370 000 m sphere; only the parallels and origin differ per
//! geography. The WKT strings below are extracted verbatim from the NWM
//! output grids and are the CRS identity the weight builder validates
//! against.

use crate::filenames::Geography;
use hydroforce_core::Crs;
use hydroforce_zonal::proj::LccSphere;

pub const CONUS_NWM_WKT: &str = "PROJCS[\"Lambert_Conformal_Conic\",GEOGCS[\"GCS_Sphere\",DATUM[\"D_Sphere\",SPHEROID[\"Sphere\",6370000.0,0.0]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],PROJECTION[\"Lambert_Conformal_Conic_2SP\"],PARAMETER[\"false_easting\",0.0],PARAMETER[\"false_northing\",0.0],PARAMETER[\"central_meridian\",-97.0],PARAMETER[\"standard_parallel_1\",30.0],PARAMETER[\"standard_parallel_2\",60.0],PARAMETER[\"latitude_of_origin\",40.0],UNIT[\"Meter\",1.0]]";

pub const HAWAII_NWM_WKT: &str = "PROJCS[\"Lambert_Conformal_Conic\",GEOGCS[\"GCS_Sphere\",DATUM[\"D_Sphere\",SPHEROID[\"Sphere\",6370000.0,0.0]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],PROJECTION[\"Lambert_Conformal_Conic_2SP\"],PARAMETER[\"false_easting\",0.0],PARAMETER[\"false_northing\",0.0],PARAMETER[\"central_meridian\",-157.42],PARAMETER[\"standard_parallel_1\",10.0],PARAMETER[\"standard_parallel_2\",30.0],PARAMETER[\"latitude_of_origin\",20.6],UNIT[\"Meter\",1.0]]";

pub const PUERTORICO_NWM_WKT: &str = "PROJCS[\"Sphere_Lambert_Conformal_Conic\",GEOGCS[\"GCS_Sphere\",DATUM[\"D_Sphere\",SPHEROID[\"Sphere\",6370000.0,0.0]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],PROJECTION[\"Lambert_Conformal_Conic_2SP\"],PARAMETER[\"false_easting\",0.0],PARAMETER[\"false_northing\",0.0],PARAMETER[\"central_meridian\",-65.91],PARAMETER[\"standard_parallel_1\",18.1],PARAMETER[\"standard_parallel_2\",18.1],PARAMETER[\"latitude_of_origin\",18.1],UNIT[\"Meter\",1.0]]";

/// Sphere radius shared by all NWM grids (m)
pub const NWM_SPHERE_RADIUS: f64 = 6_370_000.0;

/// Grid CRS for a geography, as WKT.
pub fn grid_crs(geography: Geography) -> Crs {
    Crs::from_wkt(match geography {
        Geography::Conus => CONUS_NWM_WKT,
        Geography::Hawaii => HAWAII_NWM_WKT,
        Geography::PuertoRico => PUERTORICO_NWM_WKT,
    })
}

/// Projection parameters for a geography's grid.
pub fn grid_projection(geography: Geography) -> LccSphere {
    match geography {
        Geography::Conus => LccSphere::new(30.0, 60.0, 40.0, -97.0, NWM_SPHERE_RADIUS),
        Geography::Hawaii => LccSphere::new(10.0, 30.0, 20.6, -157.42, NWM_SPHERE_RADIUS),
        Geography::PuertoRico => LccSphere::new(18.1, 18.1, 18.1, -65.91, NWM_SPHERE_RADIUS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_crs_is_projected() {
        for geo in [Geography::Conus, Geography::Hawaii, Geography::PuertoRico] {
            let crs = grid_crs(geo);
            assert!(!crs.is_geographic());
            assert!(crs.wkt().unwrap().contains("Lambert_Conformal_Conic"));
        }
    }

    #[test]
    fn test_conus_origin_matches_wkt() {
        let lcc = grid_projection(Geography::Conus);
        // Projected origin maps to (0, 0)
        let (x, y) = lcc.project(-97.0, 40.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }
}
