use crate::domain::model::{DataArray, UnstructuredGrid};
use crate::utils::error::Result;

/// Attaches `name` as a `UInt64` point array holding each point's index.
///
/// Unless `keep_existing` is set, all other point and cell arrays are dropped
/// first, so only the ids travel through the slice.
pub fn tag_points(grid: &mut UnstructuredGrid, name: &str, keep_existing: bool) -> Result<()> {
    if !keep_existing {
        grid.point_data.clear();
        grid.cell_data.clear();
    }

    let ids: Vec<u64> = (0..grid.point_count() as u64).collect();
    tracing::debug!("Tagging {} points as '{}'", ids.len(), name);
    grid.set_point_array(DataArray::uint64(name, ids))
}
