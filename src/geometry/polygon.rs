//! Closed pixel polygons and point containment.

use super::Pixel;

const EPS: f64 = 1e-9;

/// A closed polygon built from a cell outline.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn from_outline(outline: &[Pixel]) -> Self {
        Self {
            vertices: outline
                .iter()
                .map(|&(x, y)| (f64::from(x), f64::from(y)))
                .collect(),
        }
    }

    /// Fewer than three vertices never enclose anything.
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Strict interior test: points on an edge or vertex are not contained.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let p = (f64::from(point.0), f64::from(point.1));
        if self.edges().any(|(a, b)| on_segment(p, a, b)) {
            return false;
        }
        winding_number(p, &self.vertices) != 0
    }

    /// Area-weighted centroid (shoelace). `None` when the polygon has no area.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.is_degenerate() {
            return None;
        }
        let (mut area2, mut cx, mut cy) = (0.0, 0.0, 0.0);
        for ((x0, y0), (x1, y1)) in self.edges() {
            let cross = x0 * y1 - x1 * y0;
            area2 += cross;
            cx += (x0 + x1) * cross;
            cy += (y0 + y1) * cross;
        }
        if area2.abs() < EPS {
            return None;
        }
        Some((cx / (3.0 * area2), cy / (3.0 * area2)))
    }

    fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Index of the first polygon (in slice order) strictly containing `point`.
///
/// This is the first-contains-wins ownership policy; it is independent of the
/// last-write-wins pixel table kept by [`super::CellFrame`] and the two may
/// disagree where outlines overlap.
pub fn first_containing(polygons: &[Polygon], point: (f32, f32)) -> Option<usize> {
    polygons.iter().position(|poly| poly.contains(point))
}

fn winding_number((px, py): (f64, f64), verts: &[(f64, f64)]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let (x0, y0) = verts[i];
        let (x1, y1) = verts[(i + 1) % n];
        let side = cross_2d(x1 - x0, y1 - y0, px - x0, py - y0);
        if y0 <= py {
            if y1 > py && side > 0.0 {
                winding += 1;
            }
        } else if y1 <= py && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

fn on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    let cross = cross_2d(b.0 - a.0, b.1 - a.1, p.0 - a.0, p.1 - a.1);
    if cross.abs() > EPS {
        return false;
    }
    p.0 >= a.0.min(b.0) - EPS
        && p.0 <= a.0.max(b.0) + EPS
        && p.1 >= a.1.min(b.1) - EPS
        && p.1 <= a.1.max(b.1) + EPS
}

#[inline]
fn cross_2d(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}
