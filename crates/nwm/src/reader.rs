//! NWM forcing file reading
//!
//! Loads the requested variables of one forcing NetCDF file into a
//! [`VariableStack`] together with the file's valid time. Each file is
//! opened once; nodata values become NaN so zonal means can skip them.
//!
//! NWM files store the `y` axis south-to-north; arrays are flipped on read
//! so row 0 is always the northern edge and the derived [`GeoTransform`]
//! is north-up.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use hydroforce_core::{Error, GeoTransform, Result, VariableStack};
use hydroforce_zonal::aggregate::ForcingSlice;
use ndarray::{Array1, Array2, Axis};
use std::path::Path;

fn file_err(path: &Path, reason: impl ToString) -> Error {
    Error::forcing(path.display().to_string(), reason.to_string())
}

/// Grid layout of a forcing file: cell-center axes plus row order.
struct GridAxes {
    x0: f64,
    dx: f64,
    /// Northernmost row center
    y_north: f64,
    dy_abs: f64,
    /// Rows stored south-to-north and need flipping
    flip_rows: bool,
    rows: usize,
    cols: usize,
}

impl GridAxes {
    fn transform(&self) -> GeoTransform {
        GeoTransform::from_cell_centers(self.x0, self.y_north, self.dx, -self.dy_abs)
    }
}

fn read_axis(file: &netcdf::File, name: &str, path: &Path) -> Result<Array1<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| file_err(path, format!("missing coordinate variable '{}'", name)))?;
    let values = var
        .get::<f64, _>(..)
        .map_err(|e| file_err(path, format!("coordinate '{}': {}", name, e)))?;
    values
        .into_dimensionality::<ndarray::Ix1>()
        .map_err(|_| file_err(path, format!("coordinate '{}' is not 1-D", name)))
}

fn read_axes(file: &netcdf::File, path: &Path) -> Result<GridAxes> {
    let x = read_axis(file, "x", path)?;
    let y = read_axis(file, "y", path)?;
    if x.len() < 2 || y.len() < 2 {
        return Err(file_err(path, "degenerate grid axes"));
    }

    let dx = x[1] - x[0];
    let dy = y[1] - y[0];
    if dx <= 0.0 || dy == 0.0 {
        return Err(file_err(path, "unsupported grid axis orientation"));
    }

    let (y_north, flip_rows) = if dy > 0.0 {
        (y[y.len() - 1], true)
    } else {
        (y[0], false)
    };

    Ok(GridAxes {
        x0: x[0],
        dx,
        y_north,
        dy_abs: dy.abs(),
        flip_rows,
        rows: y.len(),
        cols: x.len(),
    })
}

/// Numeric value of an attribute, when it has one.
fn attr_number(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    use netcdf::AttributeValue::*;
    match var.attribute(name)?.value().ok()? {
        Schar(v) => Some(v as f64),
        Uchar(v) => Some(v as f64),
        Short(v) => Some(v as f64),
        Ushort(v) => Some(v as f64),
        Int(v) => Some(v as f64),
        Uint(v) => Some(v as f64),
        Longlong(v) => Some(v as f64),
        Ulonglong(v) => Some(v as f64),
        Float(v) => Some(v as f64),
        Double(v) => Some(v),
        Floats(v) => v.first().map(|&f| f as f64),
        Doubles(v) => v.first().copied(),
        _ => None,
    }
}

fn attr_string(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    use netcdf::AttributeValue::*;
    match var.attribute(name)?.value().ok()? {
        Str(s) => Some(s),
        Strs(v) => v.first().cloned(),
        _ => None,
    }
}

/// Read one 2-D variable (accepting a leading length-1 time axis), mapping
/// nodata to NaN and flipping rows when the file stores south-up.
fn read_band(
    file: &netcdf::File,
    name: &str,
    axes: &GridAxes,
    path: &Path,
) -> Result<Array2<f32>> {
    let var = file
        .variable(name)
        .ok_or_else(|| file_err(path, format!("missing variable '{}'", name)))?;

    let raw = var
        .get::<f32, _>(..)
        .map_err(|e| file_err(path, format!("variable '{}': {}", name, e)))?;

    let mut band = match raw.ndim() {
        2 => raw
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| file_err(path, format!("variable '{}' has bad shape", name)))?,
        3 => {
            let d3 = raw
                .into_dimensionality::<ndarray::Ix3>()
                .map_err(|_| file_err(path, format!("variable '{}' has bad shape", name)))?;
            if d3.dim().0 != 1 {
                return Err(file_err(
                    path,
                    format!("variable '{}' has {} time steps, expected 1", name, d3.dim().0),
                ));
            }
            d3.index_axis_move(Axis(0), 0)
        }
        n => {
            return Err(file_err(
                path,
                format!("variable '{}' is {}-D, expected 2-D", name, n),
            ))
        }
    };

    let (rows, cols) = band.dim();
    if (rows, cols) != (axes.rows, axes.cols) {
        return Err(file_err(
            path,
            format!(
                "variable '{}' shape ({}, {}) does not match grid ({}, {})",
                name, rows, cols, axes.rows, axes.cols
            ),
        ));
    }

    let fill = attr_number(&var, "_FillValue").or_else(|| attr_number(&var, "missing_value"));
    if let Some(fill) = fill {
        let fill = fill as f32;
        band.mapv_inplace(|v| if v == fill { f32::NAN } else { v });
    }

    if axes.flip_rows {
        band.invert_axis(Axis(0));
    }
    Ok(band)
}

/// Parse a CF time units string like `minutes since 1970-01-01 00:00:00 UTC`.
fn parse_time_units(units: &str, path: &Path) -> Result<(Duration, NaiveDateTime)> {
    let (unit, epoch_txt) = units
        .split_once(" since ")
        .ok_or_else(|| file_err(path, format!("unparseable time units '{}'", units)))?;

    let step = match unit.trim() {
        "seconds" | "second" => Duration::seconds(1),
        "minutes" | "minute" => Duration::minutes(1),
        "hours" | "hour" => Duration::hours(1),
        "days" | "day" => Duration::days(1),
        other => {
            return Err(file_err(
                path,
                format!("unsupported time unit '{}'", other),
            ))
        }
    };

    let epoch_txt = epoch_txt.trim().trim_end_matches(" UTC").trim();
    let epoch = NaiveDateTime::parse_from_str(epoch_txt, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(epoch_txt, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(epoch_txt, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        })
        .map_err(|_| file_err(path, format!("unparseable time epoch '{}'", epoch_txt)))?;

    Ok((step, epoch))
}

/// Valid time of the file, from its `time` variable.
fn read_valid_time(file: &netcdf::File, path: &Path) -> Result<DateTime<Utc>> {
    let var = file
        .variable("time")
        .ok_or_else(|| file_err(path, "missing 'time' variable"))?;
    let values = var
        .get::<f64, _>(..)
        .map_err(|e| file_err(path, format!("time variable: {}", e)))?;
    let Some(&offset) = values.iter().next() else {
        return Err(file_err(path, "empty 'time' variable"));
    };

    let units = attr_string(&var, "units")
        .ok_or_else(|| file_err(path, "time variable has no units attribute"))?;
    let (step, epoch) = parse_time_units(&units, path)?;

    let stamp = epoch + step * offset as i32;
    Ok(stamp.and_utc())
}

/// Read the grid shape and transform of a forcing file, for use as the
/// weight-building template.
pub fn read_grid_template(path: &Path) -> Result<(usize, usize, GeoTransform)> {
    let file = netcdf::open(path).map_err(|e| file_err(path, e))?;
    let axes = read_axes(&file, path)?;
    Ok((axes.rows, axes.cols, axes.transform()))
}

/// Read one forcing file: all requested variables plus the valid time.
pub fn read_forcing(path: &Path, var_names: &[String]) -> Result<ForcingSlice> {
    let file = netcdf::open(path).map_err(|e| file_err(path, e))?;
    let axes = read_axes(&file, path)?;
    let valid_time = read_valid_time(&file, path)?;

    let mut bands = Vec::with_capacity(var_names.len());
    for name in var_names {
        bands.push((name.clone(), read_band(&file, name, &axes, path)?));
    }

    Ok(ForcingSlice {
        valid_time,
        stack: VariableStack::from_bands(bands)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Write a 2x3 forcing file with ascending (south-up) y, one time step.
    fn write_fixture(path: &Path, minutes: f64, rain: &[f32]) {
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("time", 1).unwrap();
        file.add_dimension("y", 2).unwrap();
        file.add_dimension("x", 3).unwrap();

        let mut x = file.add_variable::<f64>("x", &["x"]).unwrap();
        x.put_values(&[500.0, 1500.0, 2500.0], ..).unwrap();
        let mut y = file.add_variable::<f64>("y", &["y"]).unwrap();
        y.put_values(&[500.0, 1500.0], ..).unwrap();

        let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
        time.put_attribute("units", "minutes since 1970-01-01 00:00:00 UTC")
            .unwrap();
        time.put_values(&[minutes], ..).unwrap();

        let mut var = file
            .add_variable::<f32>("RAINRATE", &["time", "y", "x"])
            .unwrap();
        var.put_attribute("_FillValue", -9999.0_f32).unwrap();
        var.put_values(rain, ..).unwrap();
    }

    #[test]
    fn test_read_forcing_flips_south_up_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.nc");
        // Stored south-up: first row is the southern edge
        write_fixture(&path, 60.0, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let slice = read_forcing(&path, &["RAINRATE".to_string()]).unwrap();
        assert_eq!(slice.stack.shape(), (2, 3));
        // Northern row first after the flip
        let band = slice.stack.band(0);
        assert_eq!(band[(0, 0)], 4.0);
        assert_eq!(band[(1, 0)], 1.0);

        assert_eq!(
            slice.valid_time,
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn test_fill_values_become_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.nc");
        write_fixture(&path, 0.0, &[1.0, -9999.0, 3.0, 4.0, 5.0, 6.0]);

        let slice = read_forcing(&path, &["RAINRATE".to_string()]).unwrap();
        // (0,1) south-up becomes (1,1) north-up
        assert!(slice.stack.band(0)[(1, 1)].is_nan());
    }

    #[test]
    fn test_grid_template_transform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.nc");
        write_fixture(&path, 0.0, &[0.0; 6]);

        let (rows, cols, transform) = read_grid_template(&path).unwrap();
        assert_eq!((rows, cols), (2, 3));
        assert_relative_eq!(transform.origin_x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(transform.origin_y, 2000.0, epsilon = 1e-9);
        assert_relative_eq!(transform.pixel_width, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(transform.pixel_height, -1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_variable_is_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.nc");
        write_fixture(&path, 0.0, &[0.0; 6]);

        let err = read_forcing(&path, &["T2D".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Forcing { .. }));
        assert!(err.to_string().contains("T2D"));
    }

    #[test]
    fn test_parse_time_units_variants() {
        let path = Path::new("x.nc");
        let (step, epoch) = parse_time_units("hours since 2020-01-01", path).unwrap();
        assert_eq!(step, Duration::hours(1));
        assert_eq!(
            epoch,
            NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_time_units("fortnights since 2020-01-01", path).is_err());
        assert!(parse_time_units("minutes", path).is_err());
    }
}
