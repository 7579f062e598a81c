//! GeoPackage geometry blob decoding
//!
//! GeoPackage stores geometries as a small binary header (magic, flags,
//! srs_id, optional envelope) followed by standard ISO WKB. Hydrofabric
//! divide layers contain Polygon and MultiPolygon geometries, so only those
//! are decoded; everything else is an error naming the unexpected type.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use hydroforce_core::{Error, Result};

/// Envelope byte lengths indexed by the header's envelope-indicator bits.
const ENVELOPE_LEN: [usize; 5] = [0, 32, 48, 48, 64];

const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

/// Decode a GeoPackage geometry blob into a MultiPolygon.
///
/// Single polygons are promoted to a one-member MultiPolygon so callers see
/// one geometry type. Z and M ordinates are read past and discarded.
pub fn decode_gpkg_geometry(blob: &[u8]) -> Result<MultiPolygon<f64>> {
    if blob.len() < 8 || blob[0] != b'G' || blob[1] != b'P' {
        return Err(Error::Gpkg("not a GeoPackage geometry blob".to_string()));
    }
    let flags = blob[3];

    // Bit 4: empty-geometry flag
    if flags & 0x10 != 0 {
        return Ok(MultiPolygon(vec![]));
    }

    let envelope_indicator = ((flags >> 1) & 0x07) as usize;
    if envelope_indicator >= ENVELOPE_LEN.len() {
        return Err(Error::Gpkg(format!(
            "invalid envelope indicator {}",
            envelope_indicator
        )));
    }

    // magic(2) + version(1) + flags(1) + srs_id(4) + envelope
    let wkb_start = 8 + ENVELOPE_LEN[envelope_indicator];
    if blob.len() <= wkb_start {
        return Err(Error::Gpkg("geometry blob truncated before WKB".to_string()));
    }

    let mut cursor = Cursor::new(&blob[wkb_start..]);
    decode_wkb_multipolygon(&mut cursor)
}

/// WKB geometry, accepting Polygon or MultiPolygon.
fn decode_wkb_multipolygon(cursor: &mut Cursor<'_>) -> Result<MultiPolygon<f64>> {
    let (base_type, dims) = cursor.read_geometry_header()?;
    match base_type {
        WKB_POLYGON => Ok(MultiPolygon(vec![read_polygon_body(cursor, dims)?])),
        WKB_MULTIPOLYGON => {
            let count = cursor.read_u32()? as usize;
            let mut polys = Vec::with_capacity(count);
            for _ in 0..count {
                // Each member is a complete WKB geometry with its own header
                let (member_type, member_dims) = cursor.read_geometry_header()?;
                if member_type != WKB_POLYGON {
                    return Err(Error::Gpkg(format!(
                        "multipolygon member has WKB type {}, expected polygon",
                        member_type
                    )));
                }
                polys.push(read_polygon_body(cursor, member_dims)?);
            }
            Ok(MultiPolygon(polys))
        }
        other => Err(Error::Gpkg(format!(
            "unsupported WKB geometry type {} (want polygon or multipolygon)",
            other
        ))),
    }
}

/// Ring count + rings, after the geometry header has been consumed.
fn read_polygon_body(cursor: &mut Cursor<'_>, dims: usize) -> Result<Polygon<f64>> {
    let num_rings = cursor.read_u32()? as usize;
    if num_rings == 0 {
        return Ok(Polygon::new(LineString(vec![]), vec![]));
    }

    let mut rings = Vec::with_capacity(num_rings);
    for _ in 0..num_rings {
        let num_points = cursor.read_u32()? as usize;
        let mut coords = Vec::with_capacity(num_points);
        for _ in 0..num_points {
            let x = cursor.read_f64()?;
            let y = cursor.read_f64()?;
            // Skip Z/M ordinates
            for _ in 2..dims {
                cursor.read_f64()?;
            }
            coords.push(Coord { x, y });
        }
        rings.push(LineString(coords));
    }

    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

/// Byte-order-aware reader over a WKB buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    little: bool,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            little: true,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(Error::Gpkg("WKB buffer truncated".to_string()));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Byte-order marker + geometry type. Returns (base type, ordinate count).
    ///
    /// Handles both ISO style (type + 1000/2000/3000 for Z/M/ZM) and EWKB
    /// style (high flag bits, optional trailing SRID).
    fn read_geometry_header(&mut self) -> Result<(u32, usize)> {
        let order = self.take(1)?[0];
        self.little = match order {
            0 => false,
            1 => true,
            other => {
                return Err(Error::Gpkg(format!("invalid WKB byte order {}", other)));
            }
        };

        let raw = self.read_u32()?;
        let has_srid = raw & 0x2000_0000 != 0;
        let ewkb_z = raw & 0x8000_0000 != 0;
        let ewkb_m = raw & 0x4000_0000 != 0;
        let iso = raw & 0x0FFF_FFFF;
        let (base, iso_z, iso_m) = match iso {
            1000..=1999 => (iso - 1000, true, false),
            2000..=2999 => (iso - 2000, false, true),
            3000..=3999 => (iso - 3000, true, true),
            _ => (iso, false, false),
        };

        if has_srid {
            self.read_u32()?;
        }

        let dims = 2 + usize::from(ewkb_z || iso_z) + usize::from(ewkb_m || iso_m);
        Ok((base, dims))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(if self.little {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
        Ok(if self.little {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }
}
