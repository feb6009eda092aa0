use std::fmt::Write as _;

use quick_xml::escape::escape;

use super::encoding::{array_to_bytes, encode_base64};
use crate::domain::model::{ArrayData, DataArray, ScalarType, UnstructuredGrid};
use crate::utils::error::{BcError, Result};

/// Options for [`write_vtu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VtuWriteOptions {
    /// zlib-compress every array (`vtkZLibDataCompressor`).
    pub compress: bool,
    /// zlib level, 0-9.
    pub level: u32,
}

impl Default for VtuWriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            level: 6,
        }
    }
}

impl VtuWriteOptions {
    fn zlib_level(&self) -> Option<u32> {
        self.compress.then_some(self.level.min(9))
    }
}

fn fmt_err(e: std::fmt::Error) -> BcError {
    BcError::ProcessingError {
        message: format!("failed to format VTU document: {}", e),
    }
}

fn write_array(
    out: &mut String,
    array: &DataArray,
    name: Option<&str>,
    options: &VtuWriteOptions,
    indent: &str,
) -> Result<()> {
    let bytes = array_to_bytes(&array.data, array.scalar_type)?;
    let payload = encode_base64(&bytes, options.zlib_level())?;

    write!(out, "{}<DataArray type=\"{}\"", indent, array.scalar_type.vtk_name()).map_err(fmt_err)?;
    if let Some(name) = name {
        write!(out, " Name=\"{}\"", escape(name)).map_err(fmt_err)?;
    }
    if array.components != 1 {
        write!(out, " NumberOfComponents=\"{}\"", array.components).map_err(fmt_err)?;
    }
    writeln!(out, " format=\"binary\">").map_err(fmt_err)?;
    writeln!(out, "{}  {}", indent, payload).map_err(fmt_err)?;
    writeln!(out, "{}</DataArray>", indent).map_err(fmt_err)?;
    Ok(())
}

/// Serialises `grid` as a VTK XML UnstructuredGrid (`.vtu`).
///
/// Every array is written inline as base64 with a `UInt64` header. Points are
/// `Float64`, connectivity and offsets `Int64`, cell types `UInt8`. Point and
/// cell arrays keep their own scalar types.
pub fn write_vtu(grid: &UnstructuredGrid, options: &VtuWriteOptions) -> Result<Vec<u8>> {
    let mut out = String::new();

    writeln!(out, "<?xml version=\"1.0\"?>").map_err(fmt_err)?;
    write!(
        out,
        "<VTKFile type=\"UnstructuredGrid\" version=\"1.0\" byte_order=\"LittleEndian\" header_type=\"UInt64\""
    )
    .map_err(fmt_err)?;
    if options.compress {
        write!(out, " compressor=\"vtkZLibDataCompressor\"").map_err(fmt_err)?;
    }
    writeln!(out, ">").map_err(fmt_err)?;
    writeln!(out, "  <UnstructuredGrid>").map_err(fmt_err)?;
    writeln!(
        out,
        "    <Piece NumberOfPoints=\"{}\" NumberOfCells=\"{}\">",
        grid.point_count(),
        grid.cell_count()
    )
    .map_err(fmt_err)?;

    let data_indent = "        ";

    writeln!(out, "      <PointData>").map_err(fmt_err)?;
    for array in &grid.point_data {
        write_array(&mut out, array, Some(&array.name), options, data_indent)?;
    }
    writeln!(out, "      </PointData>").map_err(fmt_err)?;

    writeln!(out, "      <CellData>").map_err(fmt_err)?;
    for array in &grid.cell_data {
        write_array(&mut out, array, Some(&array.name), options, data_indent)?;
    }
    writeln!(out, "      </CellData>").map_err(fmt_err)?;

    let coords: Vec<f64> = grid.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    let points = DataArray {
        name: "Points".to_string(),
        scalar_type: ScalarType::Float64,
        components: 3,
        data: ArrayData::Float(coords),
    };
    writeln!(out, "      <Points>").map_err(fmt_err)?;
    write_array(&mut out, &points, None, options, data_indent)?;
    writeln!(out, "      </Points>").map_err(fmt_err)?;

    let mut connectivity = Vec::new();
    let mut offsets = Vec::with_capacity(grid.cell_count());
    let mut types = Vec::with_capacity(grid.cell_count());
    for cell in &grid.cells {
        connectivity.extend(cell.vertices.iter().map(|&v| v as i64));
        offsets.push(connectivity.len() as i64);
        types.push(cell.kind.vtk_id() as u64);
    }
    let cell_arrays = [
        DataArray {
            name: "connectivity".to_string(),
            scalar_type: ScalarType::Int64,
            components: 1,
            data: ArrayData::Signed(connectivity),
        },
        DataArray {
            name: "offsets".to_string(),
            scalar_type: ScalarType::Int64,
            components: 1,
            data: ArrayData::Signed(offsets),
        },
        DataArray {
            name: "types".to_string(),
            scalar_type: ScalarType::UInt8,
            components: 1,
            data: ArrayData::Unsigned(types),
        },
    ];
    writeln!(out, "      <Cells>").map_err(fmt_err)?;
    for array in &cell_arrays {
        write_array(&mut out, array, Some(&array.name), options, data_indent)?;
    }
    writeln!(out, "      </Cells>").map_err(fmt_err)?;

    writeln!(out, "    </Piece>").map_err(fmt_err)?;
    writeln!(out, "  </UnstructuredGrid>").map_err(fmt_err)?;
    writeln!(out, "</VTKFile>").map_err(fmt_err)?;

    Ok(out.into_bytes())
}
