//! All-touched polygon rasterization
//!
//! Computes the set of grid cells a polygon touches: every cell whose
//! rectangle intersects the polygon, not just cells whose center falls
//! inside. This matches the "all touched" burn rule used when the weight
//! crosswalk was introduced, and keeps very small catchments (smaller than
//! one forcing cell) from rasterizing to nothing.
//!
//! Candidate cells come from the polygon's pixel-space bounding box; each
//! candidate is tested with an exact rectangle/polygon intersection
//! (vertex-in-rectangle, corner-in-polygon with even-odd rule, or
//! edge/edge crossing), so holes are respected and results are
//! deterministic for identical inputs.

use geo_types::{Coord, MultiPolygon, Polygon};
use hydroforce_core::GeoTransform;

/// Grid cells (row, col) touched by a geometry, sorted row-major and
/// deduplicated across polygon parts.
pub fn rasterize_all_touched(
    geom: &MultiPolygon<f64>,
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Vec<(usize, usize)> {
    let mut cells: Vec<(usize, usize)> = Vec::new();
    for poly in &geom.0 {
        rasterize_polygon(poly, transform, rows, cols, &mut cells);
    }
    cells.sort_unstable();
    cells.dedup();
    cells
}

fn rasterize_polygon(
    poly: &Polygon<f64>,
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    out: &mut Vec<(usize, usize)>,
) {
    // Project rings into pixel space: x = fractional column, y = fractional row
    let to_pixel = |c: &Coord<f64>| {
        let (col, row) = transform.geo_to_pixel(c.x, c.y);
        Coord { x: col, y: row }
    };
    let mut rings: Vec<Vec<Coord<f64>>> = Vec::with_capacity(1 + poly.interiors().len());
    rings.push(poly.exterior().coords().map(to_pixel).collect());
    for hole in poly.interiors() {
        rings.push(hole.coords().map(to_pixel).collect());
    }
    rings.retain(|r| r.len() >= 3);
    if rings.is_empty() {
        return;
    }

    // Pixel-space bounding box of the exterior ring
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in &rings[0] {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }

    if max_x <= 0.0 || max_y <= 0.0 || min_x >= cols as f64 || min_y >= rows as f64 {
        return;
    }

    let col_lo = min_x.floor().max(0.0) as usize;
    let row_lo = min_y.floor().max(0.0) as usize;
    // An upper bound landing exactly on a cell edge does not enter that cell
    let col_hi = ((max_x.ceil() as isize - 1).max(col_lo as isize) as usize).min(cols - 1);
    let row_hi = ((max_y.ceil() as isize - 1).max(row_lo as isize) as usize).min(rows - 1);

    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            let rect = Rect {
                x0: col as f64,
                y0: row as f64,
                x1: col as f64 + 1.0,
                y1: row as f64 + 1.0,
            };
            if rect_touches_rings(&rect, &rings) {
                out.push((row, col));
            }
        }
    }
}

struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    fn contains(&self, c: &Coord<f64>) -> bool {
        c.x >= self.x0 && c.x <= self.x1 && c.y >= self.y0 && c.y <= self.y1
    }

    fn corners(&self) -> [Coord<f64>; 4] {
        [
            Coord { x: self.x0, y: self.y0 },
            Coord { x: self.x1, y: self.y0 },
            Coord { x: self.x1, y: self.y1 },
            Coord { x: self.x0, y: self.y1 },
        ]
    }

    fn edges(&self) -> [(Coord<f64>, Coord<f64>); 4] {
        let [a, b, c, d] = self.corners();
        [(a, b), (b, c), (c, d), (d, a)]
    }
}

fn rect_touches_rings(rect: &Rect, rings: &[Vec<Coord<f64>>]) -> bool {
    // Any ring vertex inside the cell
    for ring in rings {
        if ring.iter().any(|c| rect.contains(c)) {
            return true;
        }
    }

    // Any ring edge crossing a cell edge
    for ring in rings {
        for (a, b) in ring_edges(ring) {
            for (p, q) in rect.edges() {
                if segments_intersect(a, b, p, q) {
                    return true;
                }
            }
        }
    }

    // Cell fully inside the polygon (or fully inside a hole, which the
    // even-odd test reports as outside)
    rect.corners().iter().all(|c| point_in_rings(c, rings))
}

/// Edges of a ring, closing it if the last vertex does not repeat the first.
fn ring_edges(ring: &[Coord<f64>]) -> impl Iterator<Item = (Coord<f64>, Coord<f64>)> + '_ {
    let closing = if ring.first() == ring.last() {
        None
    } else {
        Some((ring[ring.len() - 1], ring[0]))
    };
    ring.windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing)
}

/// Even-odd point-in-polygon over all rings: holes flip membership back off.
fn point_in_rings(pt: &Coord<f64>, rings: &[Vec<Coord<f64>>]) -> bool {
    let mut inside = false;
    for ring in rings {
        for (a, b) in ring_edges(ring) {
            if (a.y > pt.y) != (b.y > pt.y) {
                let x_cross = a.x + (pt.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if pt.x < x_cross {
                    inside = !inside;
                }
            }
        }
    }
    inside
}

fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Segment intersection including collinear overlap and endpoint touches.
fn segments_intersect(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>, q: Coord<f64>) -> bool {
    let d1 = orient(a, b, p);
    let d2 = orient(a, b, q);
    let d3 = orient(p, q, a);
    let d4 = orient(p, q, b);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(a, b, p))
        || (d2 == 0.0 && on_segment(a, b, q))
        || (d3 == 0.0 && on_segment(p, q, a))
        || (d4 == 0.0 && on_segment(p, q, b))
}
