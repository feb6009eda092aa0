use crate::domain::model::{Cell, CellType, PolySurface, UnstructuredGrid};
use crate::utils::error::{BcError, Result};

/// Re-expresses a sliced surface as an unstructured grid.
///
/// Points and point data are carried over unchanged. Cells are appended lines
/// first, then polygons, which is also the order of the surface's cell data.
pub fn surface_to_grid(surface: PolySurface) -> Result<UnstructuredGrid> {
    let PolySurface {
        points,
        lines,
        polygons,
        point_data,
        cell_data,
    } = surface;

    let mut cells = Vec::with_capacity(lines.len() + polygons.len());
    cells.extend(lines.into_iter().map(|l| Cell::new(CellType::Line, l.to_vec())));
    for polygon in polygons {
        let kind = match polygon.len() {
            0..=2 => {
                return Err(BcError::ProcessingError {
                    message: format!("degenerate polygon with {} points", polygon.len()),
                })
            }
            3 => CellType::Triangle,
            4 => CellType::Quad,
            _ => CellType::Polygon,
        };
        cells.push(Cell::new(kind, polygon));
    }

    let mut grid = UnstructuredGrid {
        points,
        cells,
        ..Default::default()
    };
    for array in point_data {
        grid.set_point_array(array)?;
    }
    for array in cell_data {
        grid.set_cell_array(array)?;
    }

    tracing::debug!(
        "Converted surface to grid: {} points, {} cells",
        grid.point_count(),
        grid.cell_count()
    );
    Ok(grid)
}
