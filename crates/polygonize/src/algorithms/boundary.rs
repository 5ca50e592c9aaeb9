//! Pixel-edge boundary tracing for a single labelled region.
//!
//! Boundaries run along pixel edges, so every vertex sits on a pixel corner
//! and the traced polygon covers exactly the region's pixels. Each boundary
//! edge is directed with the region on its right-hand side (rows grow
//! downwards), which makes the exterior ring's signed area positive and every
//! hole's negative.
//!
//! Regions are 4-connected, so two region pixels that touch only at a corner
//! are already joined by some other path. At such a corner the walk turns
//! left and stays on the region side. Every ring is then simple: one exterior
//! and one hole per 4-connected patch of enclosed background. Rings may touch
//! each other at a single corner.

use std::collections::HashMap;

use geo_types::{Coord, LineString, Polygon};

type Corner = (i64, i64);

/// Inclusive pixel bounds of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_col: u32,
    pub min_row: u32,
    pub max_col: u32,
    pub max_row: u32,
}

impl PixelBounds {
    pub fn new(col: u32, row: u32) -> Self {
        Self {
            min_col: col,
            min_row: row,
            max_col: col,
            max_row: row,
        }
    }

    pub fn include(&mut self, col: u32, row: u32) {
        self.min_col = self.min_col.min(col);
        self.min_row = self.min_row.min(row);
        self.max_col = self.max_col.max(col);
        self.max_row = self.max_row.max(row);
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Corner,
    to: Corner,
}

impl Edge {
    fn direction(&self) -> Corner {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Trace the outline of the pixels for which `inside(col, row)` holds within `bounds`.
///
/// `inside` must answer `false` for coordinates outside the raster.
pub fn trace_region(bounds: PixelBounds, inside: impl Fn(i64, i64) -> bool) -> Polygon<f64> {
    let edges = boundary_edges(bounds, &inside);
    let rings = link_rings(&edges);

    let mut rings: Vec<(i64, Vec<Corner>)> = rings
        .into_iter()
        .map(|ring| (doubled_signed_area(&ring), ring))
        .collect();

    let exterior_index = rings
        .iter()
        .enumerate()
        .max_by_key(|(_, (area, _))| *area)
        .map(|(index, _)| index);

    let Some(exterior_index) = exterior_index else {
        return Polygon::new(LineString::new(vec![]), vec![]);
    };
    let (_, exterior) = rings.swap_remove(exterior_index);

    let holes = rings
        .into_iter()
        .map(|(_, ring)| to_line_string(&ring))
        .collect();

    Polygon::new(to_line_string(&exterior), holes)
}

/// Collect the directed edges separating region pixels from everything else, in row-major order
fn boundary_edges(bounds: PixelBounds, inside: &impl Fn(i64, i64) -> bool) -> Vec<Edge> {
    let mut edges = Vec::new();

    for row in i64::from(bounds.min_row)..=i64::from(bounds.max_row) {
        for col in i64::from(bounds.min_col)..=i64::from(bounds.max_col) {
            if !inside(col, row) {
                continue;
            }
            if !inside(col, row - 1) {
                edges.push(Edge { from: (col, row), to: (col + 1, row) });
            }
            if !inside(col + 1, row) {
                edges.push(Edge { from: (col + 1, row), to: (col + 1, row + 1) });
            }
            if !inside(col, row + 1) {
                edges.push(Edge { from: (col + 1, row + 1), to: (col, row + 1) });
            }
            if !inside(col - 1, row) {
                edges.push(Edge { from: (col, row + 1), to: (col, row) });
            }
        }
    }

    edges
}

/// Chain directed edges into closed rings, returning each ring's corner sequence
fn link_rings(edges: &[Edge]) -> Vec<Vec<Corner>> {
    let mut outgoing: HashMap<Corner, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (index, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(index);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            let edge = edges[current];
            ring.push(edge.from);

            let (dx, dy) = edge.direction();
            let preferred = [(dy, -dx), (dx, dy), (-dy, dx)];
            let candidates = outgoing.get(&edge.to).map(Vec::as_slice).unwrap_or_default();

            let next = preferred.iter().find_map(|direction| {
                candidates.iter().copied().find(|&index| {
                    (index == start || !used[index]) && edges[index].direction() == *direction
                })
            });

            match next {
                Some(index) if index != start => current = index,
                _ => break,
            }
        }

        rings.push(drop_collinear(ring));
    }

    rings
}

/// Keep only the corners where the boundary changes direction
fn drop_collinear(ring: Vec<Corner>) -> Vec<Corner> {
    let n = ring.len();
    if n < 3 {
        return ring;
    }

    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let here = ring[i];
            let next = ring[(i + 1) % n];
            let incoming = ((here.0 - prev.0).signum(), (here.1 - prev.1).signum());
            let outgoing = ((next.0 - here.0).signum(), (next.1 - here.1).signum());
            incoming != outgoing
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the shoelace area; positive for rings with the region on their right
fn doubled_signed_area(ring: &[Corner]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn to_line_string(ring: &[Corner]) -> LineString<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| Coord {
            x: x as f64,
            y: y as f64,
        })
        .collect();
    // Polygon::new closes the ring
    LineString::new(coords)
}
