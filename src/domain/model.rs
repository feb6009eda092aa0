use nalgebra::{Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::utils::error::{BcError, Result};

/// Name of the per-point id array correlating slice points with bulk mesh points.
pub const POINT_ID_ARRAY: &str = "bulk_node_ids";

/// Name of the per-point mass flux array read by the solver.
pub const MASS_FLUX_ARRAY: &str = "mass_flux";

/// On-disk scalar type of a data array, using the VTK XML type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarType {
    pub fn from_vtk_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "Int8" | "Char" => Self::Int8,
            "UInt8" | "UnsignedChar" => Self::UInt8,
            "Int16" | "Short" => Self::Int16,
            "UInt16" | "UnsignedShort" => Self::UInt16,
            "Int32" | "Int" => Self::Int32,
            "UInt32" | "UnsignedInt" => Self::UInt32,
            "Int64" | "Long" | "IdType" => Self::Int64,
            "UInt64" | "UnsignedLong" => Self::UInt64,
            "Float32" | "Float" => Self::Float32,
            "Float64" | "Double" => Self::Float64,
            _ => return None,
        };
        Some(scalar)
    }

    pub fn vtk_name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }
}

/// Values of a data array, widened to 64 bits.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Float(Vec<f64>),
    Signed(Vec<i64>),
    Unsigned(Vec<u64>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Signed(v) => v.len(),
            Self::Unsigned(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_as_f64(&self, index: usize) -> f64 {
        match self {
            Self::Float(v) => v[index],
            Self::Signed(v) => v[index] as f64,
            Self::Unsigned(v) => v[index] as f64,
        }
    }

    fn empty_like(&self, capacity: usize) -> Self {
        match self {
            Self::Float(_) => Self::Float(Vec::with_capacity(capacity)),
            Self::Signed(_) => Self::Signed(Vec::with_capacity(capacity)),
            Self::Unsigned(_) => Self::Unsigned(Vec::with_capacity(capacity)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub scalar_type: ScalarType,
    pub components: usize,
    pub data: ArrayData,
}

impl DataArray {
    pub fn float64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::Float64,
            components: 1,
            data: ArrayData::Float(values),
        }
    }

    pub fn uint64(name: impl Into<String>, values: Vec<u64>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::UInt64,
            components: 1,
            data: ArrayData::Unsigned(values),
        }
    }

    /// Number of tuples, i.e. values divided by components.
    pub fn tuple_count(&self) -> usize {
        self.data.len() / self.components.max(1)
    }

    /// Empty array with the same name and layout, ready for `push_*`.
    pub fn empty_like(&self, tuples: usize) -> Self {
        Self {
            name: self.name.clone(),
            scalar_type: self.scalar_type,
            components: self.components,
            data: self.data.empty_like(tuples * self.components),
        }
    }

    /// Appends a copy of tuple `index` of `source`.
    pub fn push_tuple_from(&mut self, source: &DataArray, index: usize) {
        let range = index * source.components..(index + 1) * source.components;
        match (&mut self.data, &source.data) {
            (ArrayData::Float(dst), ArrayData::Float(src)) => dst.extend_from_slice(&src[range]),
            (ArrayData::Signed(dst), ArrayData::Signed(src)) => dst.extend_from_slice(&src[range]),
            (ArrayData::Unsigned(dst), ArrayData::Unsigned(src)) => dst.extend_from_slice(&src[range]),
            _ => unreachable!("arrays created with empty_like share their storage kind"),
        }
    }

    /// Appends a tuple blended between tuples `a` and `b` of `source`.
    ///
    /// Floating point data is interpolated linearly. Integer data (ids, material
    /// markers) cannot be blended, so the tuple of the nearer endpoint is copied.
    pub fn push_interpolated_from(&mut self, source: &DataArray, a: usize, b: usize, t: f64) {
        let n = source.components;
        match (&mut self.data, &source.data) {
            (ArrayData::Float(dst), ArrayData::Float(src)) => {
                for c in 0..n {
                    let va = src[a * n + c];
                    let vb = src[b * n + c];
                    dst.push(va + t * (vb - va));
                }
            }
            _ => {
                let nearer = if t <= 0.5 { a } else { b };
                self.push_tuple_from(source, nearer);
            }
        }
    }
}

/// Linear VTK cell types handled by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Vertex,
    PolyVertex,
    Line,
    PolyLine,
    Triangle,
    TriangleStrip,
    Polygon,
    Pixel,
    Quad,
    Tetra,
    Voxel,
    Hexahedron,
    Wedge,
    Pyramid,
    /// Any other VTK cell (quadratic, polyhedron, ...) kept by its numeric code.
    Other(u8),
}

impl CellType {
    pub fn from_vtk_id(id: u8) -> Self {
        match id {
            1 => Self::Vertex,
            2 => Self::PolyVertex,
            3 => Self::Line,
            4 => Self::PolyLine,
            5 => Self::Triangle,
            6 => Self::TriangleStrip,
            7 => Self::Polygon,
            8 => Self::Pixel,
            9 => Self::Quad,
            10 => Self::Tetra,
            11 => Self::Voxel,
            12 => Self::Hexahedron,
            13 => Self::Wedge,
            14 => Self::Pyramid,
            other => Self::Other(other),
        }
    }

    pub fn vtk_id(self) -> u8 {
        match self {
            Self::Vertex => 1,
            Self::PolyVertex => 2,
            Self::Line => 3,
            Self::PolyLine => 4,
            Self::Triangle => 5,
            Self::TriangleStrip => 6,
            Self::Polygon => 7,
            Self::Pixel => 8,
            Self::Quad => 9,
            Self::Tetra => 10,
            Self::Voxel => 11,
            Self::Hexahedron => 12,
            Self::Wedge => 13,
            Self::Pyramid => 14,
            Self::Other(id) => id,
        }
    }

    pub fn dimension(self) -> Option<u8> {
        match self {
            Self::Vertex | Self::PolyVertex => Some(0),
            Self::Line | Self::PolyLine => Some(1),
            Self::Triangle | Self::TriangleStrip | Self::Polygon | Self::Pixel | Self::Quad => Some(2),
            Self::Tetra | Self::Voxel | Self::Hexahedron | Self::Wedge | Self::Pyramid => Some(3),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: CellType,
    pub vertices: Vec<usize>,
}

impl Cell {
    pub fn new(kind: CellType, vertices: Vec<usize>) -> Self {
        Self { kind, vertices }
    }
}

/// Volumetric mesh: the dataset type the loader produces and the writer expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnstructuredGrid {
    pub points: Vec<Point3<f64>>,
    pub cells: Vec<Cell>,
    pub point_data: Vec<DataArray>,
    pub cell_data: Vec<DataArray>,
}

impl UnstructuredGrid {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn point_array(&self, name: &str) -> Option<&DataArray> {
        self.point_data.iter().find(|a| a.name == name)
    }

    pub fn cell_array(&self, name: &str) -> Option<&DataArray> {
        self.cell_data.iter().find(|a| a.name == name)
    }

    /// Attaches a point array, replacing any array with the same name.
    pub fn set_point_array(&mut self, array: DataArray) -> Result<()> {
        Self::check_length(&array, self.points.len())?;
        upsert(&mut self.point_data, array);
        Ok(())
    }

    pub fn set_cell_array(&mut self, array: DataArray) -> Result<()> {
        Self::check_length(&array, self.cells.len())?;
        upsert(&mut self.cell_data, array);
        Ok(())
    }

    fn check_length(array: &DataArray, tuples: usize) -> Result<()> {
        let expected = tuples * array.components;
        if array.data.len() != expected {
            return Err(BcError::ArrayLengthMismatch {
                name: array.name.clone(),
                expected,
                actual: array.data.len(),
            });
        }
        Ok(())
    }
}

fn upsert(arrays: &mut Vec<DataArray>, array: DataArray) {
    match arrays.iter_mut().find(|a| a.name == array.name) {
        Some(existing) => *existing = array,
        None => arrays.push(array),
    }
}

/// Polygonal surface produced by the cutter, the polydata counterpart of
/// [`UnstructuredGrid`]. Cell data is indexed lines first, then polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolySurface {
    pub points: Vec<Point3<f64>>,
    pub lines: Vec<[usize; 2]>,
    pub polygons: Vec<Vec<usize>>,
    pub point_data: Vec<DataArray>,
    pub cell_data: Vec<DataArray>,
}

impl PolySurface {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        self.lines.len() + self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Cutting plane given by an origin and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlane {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl SlicePlane {
    pub fn new(origin: [f64; 3], normal: [f64; 3]) -> Result<Self> {
        if origin.iter().chain(normal.iter()).any(|c| !c.is_finite()) {
            return Err(BcError::InvalidConfigValueError {
                field: "slice".to_string(),
                value: format!("origin {:?}, normal {:?}", origin, normal),
                reason: "Plane coordinates must be finite".to_string(),
            });
        }
        let normal = Unit::try_new(Vector3::from(normal), f64::EPSILON).ok_or_else(|| {
            BcError::InvalidConfigValueError {
                field: "slice_normal".to_string(),
                value: format!("{:?}", normal),
                reason: "Normal vector must not be zero".to_string(),
            }
        })?;
        Ok(Self {
            origin: Point3::from(origin),
            normal,
        })
    }

    /// Signed distance of `point` from the plane along the normal.
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&(*point - self.origin))
    }

    /// Distance of `point` from the origin, measured within the plane.
    pub fn in_plane_radius(&self, point: &Point3<f64>) -> f64 {
        let offset = *point - self.origin;
        let along = self.normal.dot(&offset);
        (offset - self.normal.into_inner() * along).norm()
    }

    /// Orthonormal (u, v) basis spanning the plane.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let n = self.normal.into_inner();
        let helper = if n.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = n.cross(&helper).normalize();
        let v = n.cross(&u);
        (u, v)
    }
}

/// Which quantity of a slice point is used as the profile's radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum RadialAxis {
    /// First coordinate component.
    #[default]
    X,
    Y,
    Z,
    /// Distance from the slice origin within the slice plane.
    Plane,
}

impl RadialAxis {
    pub fn radius_of(self, point: &Point3<f64>, plane: &SlicePlane) -> f64 {
        match self {
            Self::X => point.x,
            Self::Y => point.y,
            Self::Z => point.z,
            Self::Plane => plane.in_plane_radius(point),
        }
    }
}

/// What to do with slice radii outside the sampled profile range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    #[default]
    Error,
    /// Use the velocity of the nearest profile end.
    Clamp,
}

/// Data handed from the extract stage to the transform stage.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub grid: UnstructuredGrid,
    pub profile: crate::core::profile::VelocityProfile,
}

/// Per-point values kept alongside the output grid for the point table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub bulk_node_id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
    pub velocity: f64,
    pub mass_flux: f64,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub grid: UnstructuredGrid,
    pub report: crate::core::flux::FluxReport,
    pub points: Vec<PointRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_point_array_checks_length() {
        let mut grid = UnstructuredGrid {
            points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            ..Default::default()
        };
        assert!(grid.set_point_array(DataArray::float64("a", vec![1.0, 2.0])).is_ok());
        assert!(grid.set_point_array(DataArray::float64("b", vec![1.0])).is_err());

        grid.set_point_array(DataArray::float64("a", vec![3.0, 4.0])).unwrap();
        assert_eq!(grid.point_data.len(), 1);
        assert_eq!(grid.point_array("a").unwrap().data, ArrayData::Float(vec![3.0, 4.0]));
    }

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(SlicePlane::new([0.0; 3], [0.0; 3]).is_err());
        let plane = SlicePlane::new([0.0; 3], [0.0, 0.0, 2.0]).unwrap();
        assert_eq!(plane.normal.into_inner(), Vector3::z());
    }

    #[test]
    fn test_radial_axis() {
        let plane = SlicePlane::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0]).unwrap();
        let p = Point3::new(4.0, 5.0, 3.0);
        assert_eq!(RadialAxis::X.radius_of(&p, &plane), 4.0);
        assert_eq!(RadialAxis::Z.radius_of(&p, &plane), 3.0);
        assert!((RadialAxis::Plane.radius_of(&p, &plane) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_integer_arrays_take_nearer_endpoint() {
        let ids = DataArray::uint64("ids", vec![7, 9]);
        let mut out = ids.empty_like(2);
        out.push_interpolated_from(&ids, 0, 1, 0.2);
        out.push_interpolated_from(&ids, 0, 1, 0.8);
        assert_eq!(out.data, ArrayData::Unsigned(vec![7, 9]));

        let values = DataArray::float64("v", vec![0.0, 10.0]);
        let mut out = values.empty_like(1);
        out.push_interpolated_from(&values, 0, 1, 0.25);
        assert_eq!(out.data, ArrayData::Float(vec![2.5]));
    }

    #[test]
    fn test_cell_type_codes() {
        assert_eq!(CellType::from_vtk_id(12), CellType::Hexahedron);
        assert_eq!(CellType::Hexahedron.vtk_id(), 12);
        assert_eq!(CellType::from_vtk_id(25), CellType::Other(25));
        assert_eq!(CellType::Other(25).dimension(), None);
    }
}
