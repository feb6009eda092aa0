use crate::adapters::vtu::{read_vtu, write_vtu, VtuWriteOptions};
use crate::core::{convert, slice};
use crate::domain::model::{PolySurface, SlicePlane, UnstructuredGrid};
use crate::domain::ports::{MeshToolkit, Storage};
use crate::utils::error::{BcError, Result};

/// [`MeshToolkit`] backed by the built-in `.vtu` codec and planar cutter.
#[derive(Debug, Clone)]
pub struct VtkToolkit<S: Storage> {
    storage: S,
    write_options: VtuWriteOptions,
}

impl<S: Storage> VtkToolkit<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_options: VtuWriteOptions::default(),
        }
    }

    pub fn with_write_options(mut self, options: VtuWriteOptions) -> Self {
        self.write_options = options;
        self
    }

    fn check_extension(path: &str) -> Result<()> {
        let is_vtu = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("vtu"));
        if is_vtu {
            Ok(())
        } else {
            Err(BcError::UnsupportedFormat {
                message: format!("'{}' is not a .vtu file", path),
            })
        }
    }
}

impl<S: Storage> MeshToolkit for VtkToolkit<S> {
    async fn load(&self, path: &str) -> Result<UnstructuredGrid> {
        Self::check_extension(path)?;
        let bytes = self.storage.read_file(path).await?;
        let grid = read_vtu(&bytes)?;
        tracing::info!(
            "📥 Loaded mesh {}: {} points, {} cells",
            path,
            grid.point_count(),
            grid.cell_count()
        );
        Ok(grid)
    }

    fn slice(&self, grid: &UnstructuredGrid, plane: &SlicePlane) -> Result<PolySurface> {
        slice::slice_grid(grid, plane)
    }

    fn to_volume(&self, surface: PolySurface) -> Result<UnstructuredGrid> {
        convert::surface_to_grid(surface)
    }

    async fn save(&self, grid: &UnstructuredGrid, path: &str) -> Result<()> {
        Self::check_extension(path)?;
        let bytes = write_vtu(grid, &self.write_options)?;
        self.storage.write_file(path, &bytes).await?;
        tracing::info!("📤 Wrote {} ({} bytes)", path, bytes.len());
        Ok(())
    }
}
