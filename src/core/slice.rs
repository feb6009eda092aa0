//! Planar cutting of unstructured grids without triangulation.
//!
//! Every cell crossed by the plane contributes one output cell: 3D cells yield
//! a convex polygon, 2D cells a line segment. Intersection points are shared
//! between neighbouring cells so the resulting surface is conforming.
//!
//! Vertices are classified as "above" when their signed distance is `>= 0`.
//! A plane running exactly through a mesh face is therefore emitted once, by
//! the cell lying below it, just like marching-cells contouring does.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::domain::model::{Cell, CellType, PolySurface, SlicePlane, UnstructuredGrid};
use crate::utils::error::{BcError, Result};

const TETRA_EDGES: &[(usize, usize)] = &[(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];
const HEXAHEDRON_EDGES: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (3, 2),
    (0, 3),
    (4, 5),
    (5, 6),
    (7, 6),
    (4, 7),
    (0, 4),
    (1, 5),
    (3, 7),
    (2, 6),
];
const VOXEL_EDGES: &[(usize, usize)] = &[
    (0, 1),
    (1, 3),
    (2, 3),
    (0, 2),
    (4, 5),
    (5, 7),
    (6, 7),
    (4, 6),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];
const WEDGE_EDGES: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 0),
    (3, 4),
    (4, 5),
    (5, 3),
    (0, 3),
    (1, 4),
    (2, 5),
];
const PYRAMID_EDGES: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (0, 4),
    (1, 4),
    (2, 4),
    (3, 4),
];
const PIXEL_EDGES: &[(usize, usize)] = &[(0, 1), (1, 3), (3, 2), (2, 0)];

/// Local edge list of a cell, or `None` for cells the cutter does not handle.
fn cell_edges(cell: &Cell) -> Option<Vec<(usize, usize)>> {
    let table = match cell.kind {
        CellType::Tetra => TETRA_EDGES,
        CellType::Hexahedron => HEXAHEDRON_EDGES,
        CellType::Voxel => VOXEL_EDGES,
        CellType::Wedge => WEDGE_EDGES,
        CellType::Pyramid => PYRAMID_EDGES,
        CellType::Pixel => PIXEL_EDGES,
        CellType::Triangle | CellType::Quad | CellType::Polygon => {
            let n = cell.vertices.len();
            return Some((0..n).map(|i| (i, (i + 1) % n)).collect());
        }
        _ => return None,
    };
    Some(table.to_vec())
}

/// Identity of an output point, so cells sharing it reuse the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PointKey {
    /// A mesh vertex lying on the plane.
    Vertex(usize),
    /// An interior crossing of the mesh edge `(lo, hi)`, `lo < hi`.
    Edge(usize, usize),
}

struct SurfaceBuilder<'a> {
    grid: &'a UnstructuredGrid,
    distances: Vec<f64>,
    surface: PolySurface,
    point_index: HashMap<PointKey, usize>,
    line_sources: Vec<usize>,
    polygon_sources: Vec<usize>,
}

impl<'a> SurfaceBuilder<'a> {
    fn new(grid: &'a UnstructuredGrid, plane: &SlicePlane) -> Self {
        let distances = grid.points.iter().map(|p| plane.signed_distance(p)).collect();
        let surface = PolySurface {
            point_data: grid.point_data.iter().map(|a| a.empty_like(0)).collect(),
            ..Default::default()
        };
        Self {
            grid,
            distances,
            surface,
            point_index: HashMap::new(),
            line_sources: Vec::new(),
            polygon_sources: Vec::new(),
        }
    }

    fn above(&self, vertex: usize) -> bool {
        self.distances[vertex] >= 0.0
    }

    /// Output index of the point where the plane crosses mesh edge `(a, b)`.
    fn crossing(&mut self, a: usize, b: usize) -> usize {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (d_lo, d_hi) = (self.distances[lo], self.distances[hi]);
        let t = d_lo / (d_lo - d_hi);

        let key = if t <= 0.0 {
            PointKey::Vertex(lo)
        } else if t >= 1.0 {
            PointKey::Vertex(hi)
        } else {
            PointKey::Edge(lo, hi)
        };

        if let Some(&index) = self.point_index.get(&key) {
            return index;
        }

        let index = self.surface.points.len();
        match key {
            PointKey::Vertex(v) => {
                self.surface.points.push(self.grid.points[v]);
                for (out, src) in self.surface.point_data.iter_mut().zip(&self.grid.point_data) {
                    out.push_tuple_from(src, v);
                }
            }
            PointKey::Edge(lo, hi) => {
                let p_lo = self.grid.points[lo].coords;
                let p_hi = self.grid.points[hi].coords;
                self.surface.points.push(Point3::from(p_lo + (p_hi - p_lo) * t));
                for (out, src) in self.surface.point_data.iter_mut().zip(&self.grid.point_data) {
                    out.push_interpolated_from(src, lo, hi, t);
                }
            }
        }
        self.point_index.insert(key, index);
        index
    }

    /// Distinct crossing points of `cell`, in edge order.
    fn cell_crossings(&mut self, cell: &Cell, edges: &[(usize, usize)]) -> Vec<usize> {
        let mut crossings: Vec<usize> = Vec::new();
        for &(i, j) in edges {
            let (a, b) = (cell.vertices[i], cell.vertices[j]);
            if self.above(a) != self.above(b) {
                let index = self.crossing(a, b);
                if !crossings.contains(&index) {
                    crossings.push(index);
                }
            }
        }
        crossings
    }

    fn cut_volume_cell(&mut self, cell_index: usize, crossings: Vec<usize>, plane: &SlicePlane) {
        if crossings.len() < 3 {
            return;
        }
        let polygon = order_around_centroid(&self.surface.points, crossings, plane);
        self.surface.polygons.push(polygon);
        self.polygon_sources.push(cell_index);
    }

    fn cut_face_cell(&mut self, cell_index: usize, crossings: Vec<usize>) {
        match crossings.len() {
            0 | 1 => {}
            2 => {
                self.surface.lines.push([crossings[0], crossings[1]]);
                self.line_sources.push(cell_index);
            }
            _ => {
                // Non-convex polygon: pair crossings along the cut direction.
                let mut sorted = crossings;
                let points = &self.surface.points;
                let start = points[sorted[0]];
                let far = sorted
                    .iter()
                    .map(|&i| points[i])
                    .max_by(|a, b| (*a - start).norm().total_cmp(&(*b - start).norm()))
                    .unwrap_or(start);
                let direction = far - start;
                sorted.sort_by(|&a, &b| {
                    (points[a] - start)
                        .dot(&direction)
                        .total_cmp(&(points[b] - start).dot(&direction))
                });
                for pair in sorted.chunks_exact(2) {
                    self.surface.lines.push([pair[0], pair[1]]);
                    self.line_sources.push(cell_index);
                }
            }
        }
    }

    fn finish(mut self) -> PolySurface {
        // Cell data follows the surface cell order: lines, then polygons.
        for source in &self.grid.cell_data {
            let mut out = source.empty_like(self.line_sources.len() + self.polygon_sources.len());
            for &cell in self.line_sources.iter().chain(&self.polygon_sources) {
                out.push_tuple_from(source, cell);
            }
            self.surface.cell_data.push(out);
        }
        self.surface
    }
}

/// Orders the points of a planar convex polygon counter-clockwise about the plane normal.
fn order_around_centroid(points: &[Point3<f64>], mut polygon: Vec<usize>, plane: &SlicePlane) -> Vec<usize> {
    let (u, v) = plane.basis();
    let centroid = polygon
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, &i| acc + points[i].coords)
        / polygon.len() as f64;

    let angle = |i: usize| {
        let offset = points[i].coords - centroid;
        offset.dot(&v).atan2(offset.dot(&u))
    };
    polygon.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
    polygon
}

/// Cuts `grid` with `plane`, keeping original cell shapes.
pub fn slice_grid(grid: &UnstructuredGrid, plane: &SlicePlane) -> Result<PolySurface> {
    for cell in &grid.cells {
        if let Some(&v) = cell.vertices.iter().find(|&&v| v >= grid.point_count()) {
            return Err(BcError::format(format!(
                "cell references point {} but the mesh has {} points",
                v,
                grid.point_count()
            )));
        }
    }

    let mut builder = SurfaceBuilder::new(grid, plane);
    let mut skipped: HashMap<u8, usize> = HashMap::new();

    for (cell_index, cell) in grid.cells.iter().enumerate() {
        let Some(edges) = cell_edges(cell) else {
            *skipped.entry(cell.kind.vtk_id()).or_default() += 1;
            continue;
        };
        if edges.iter().any(|&(i, j)| i.max(j) >= cell.vertices.len()) {
            return Err(BcError::format(format!(
                "cell {} of type {:?} has only {} vertices",
                cell_index,
                cell.kind,
                cell.vertices.len()
            )));
        }

        let crossings = builder.cell_crossings(cell, &edges);
        match cell.kind.dimension() {
            Some(3) => builder.cut_volume_cell(cell_index, crossings, plane),
            _ => builder.cut_face_cell(cell_index, crossings),
        }
    }

    for (vtk_id, count) in &skipped {
        tracing::warn!("⚠️ Skipped {} cells of unsupported VTK type {}", count, vtk_id);
    }

    let surface = builder.finish();
    tracing::debug!(
        "Slice produced {} points, {} polygons, {} lines",
        surface.point_count(),
        surface.polygons.len(),
        surface.lines.len()
    );
    Ok(surface)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::{ArrayData, DataArray};

    /// `nz` unit hexahedra stacked along z, with a `level` cell array.
    pub(crate) fn hex_column(nz: usize) -> UnstructuredGrid {
        let mut points = Vec::new();
        for k in 0..=nz {
            for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                points.push(Point3::new(x, y, k as f64));
            }
        }
        let cells = (0..nz)
            .map(|k| {
                let b = 4 * k;
                Cell::new(
                    CellType::Hexahedron,
                    vec![b, b + 1, b + 2, b + 3, b + 4, b + 5, b + 6, b + 7],
                )
            })
            .collect();
        UnstructuredGrid {
            points,
            cells,
            point_data: Vec::new(),
            cell_data: vec![DataArray::float64("level", (0..nz).map(|k| k as f64).collect())],
        }
    }

    fn z_plane(z: f64) -> SlicePlane {
        SlicePlane::new([0.0, 0.0, z], [0.0, 0.0, 1.0]).unwrap()
    }

    #[test]
    fn test_mid_cut_gives_single_quad() {
        let grid = hex_column(1);
        let surface = slice_grid(&grid, &z_plane(0.5)).unwrap();

        assert_eq!(surface.point_count(), 4);
        assert_eq!(surface.polygons.len(), 1);
        assert_eq!(surface.polygons[0].len(), 4);
        assert!(surface.lines.is_empty());
        assert!(surface.points.iter().all(|p| (p.z - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_plane_on_shared_face_is_emitted_once() {
        let grid = hex_column(2);
        let surface = slice_grid(&grid, &z_plane(1.0)).unwrap();

        assert_eq!(surface.polygons.len(), 1);
        assert_eq!(surface.point_count(), 4);
        // Emitted by the lower cell.
        assert_eq!(surface.cell_data[0].data, ArrayData::Float(vec![0.0]));
    }

    #[test]
    fn test_ids_on_plane_are_exact() {
        let mut grid = hex_column(2);
        let ids = (0..grid.point_count() as u64).collect();
        grid.point_data.push(DataArray::uint64("ids", ids));

        let surface = slice_grid(&grid, &z_plane(1.0)).unwrap();
        let ArrayData::Unsigned(ids) = &surface.point_data[0].data else {
            panic!("ids must stay unsigned");
        };
        let mut ids = ids.clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_float_arrays_are_interpolated() {
        let mut grid = hex_column(1);
        let z: Vec<f64> = grid.points.iter().map(|p| p.z * 10.0).collect();
        grid.point_data.push(DataArray::float64("z10", z));

        let surface = slice_grid(&grid, &z_plane(0.25)).unwrap();
        let ArrayData::Float(values) = &surface.point_data[0].data else {
            panic!("expected float data");
        };
        assert!(values.iter().all(|v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_tetra_cut_gives_triangle() {
        let grid = UnstructuredGrid {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            cells: vec![Cell::new(CellType::Tetra, vec![0, 1, 2, 3])],
            ..Default::default()
        };
        let surface = slice_grid(&grid, &z_plane(0.5)).unwrap();
        assert_eq!(surface.polygons.len(), 1);
        assert_eq!(surface.polygons[0].len(), 3);
    }

    #[test]
    fn test_polygon_is_ordered_around_normal() {
        let grid = hex_column(1);
        let plane = z_plane(0.5);
        let surface = slice_grid(&grid, &plane).unwrap();
        let poly = &surface.polygons[0];

        let p = |i: usize| surface.points[poly[i]];
        let area_normal = (p(1) - p(0)).cross(&(p(2) - p(0)));
        assert!(plane.normal.dot(&area_normal) > 0.0);
    }

    #[test]
    fn test_quad_cut_gives_line() {
        let grid = UnstructuredGrid {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            cells: vec![Cell::new(CellType::Quad, vec![0, 1, 2, 3])],
            ..Default::default()
        };
        let surface = slice_grid(&grid, &z_plane(0.5)).unwrap();
        assert_eq!(surface.lines.len(), 1);
        assert!(surface.polygons.is_empty());
    }

    #[test]
    fn test_plane_missing_the_mesh() {
        let grid = hex_column(1);
        let surface = slice_grid(&grid, &z_plane(5.0)).unwrap();
        assert!(surface.is_empty());
        assert_eq!(surface.cell_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_connectivity_is_rejected() {
        let mut grid = hex_column(1);
        grid.cells[0].vertices[7] = 99;
        assert!(slice_grid(&grid, &z_plane(0.5)).is_err());
    }
}
